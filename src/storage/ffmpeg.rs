// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use tokio::process::Command;
use tracing::debug;

use super::traits::FrameExtractor;
use crate::error::MediaError;

/// [`FrameExtractor`] that shells out to an `ffmpeg` binary and reads a
/// single PNG frame from its stdout.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    binary: PathBuf,
}

impl FfmpegFrameExtractor {
    /// Use `ffmpeg` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    async fn grab(&self, video: &Path, at: Duration) -> Result<Vec<u8>, MediaError> {
        let output = Command::new(&self.binary)
            .arg("-v")
            .arg("error")
            .arg("-ss")
            .arg(format!("{:.3}", at.as_secs_f64()))
            .arg("-i")
            .arg(video)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::ThumbnailGeneration(format!("failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(MediaError::ThumbnailGeneration(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frame(&self, video: &Path, at: Duration) -> Result<DynamicImage, MediaError> {
        let mut png = self.grab(video, at).await?;
        // Seeking past the end of a short clip yields no frame
        if png.is_empty() && !at.is_zero() {
            debug!(video = %video.display(), "No frame at offset, using first frame");
            png = self.grab(video, Duration::ZERO).await?;
        }
        if png.is_empty() {
            return Err(MediaError::ThumbnailGeneration(format!(
                "no decodable frame in {}",
                video.display()
            )));
        }
        image::load_from_memory(&png).map_err(|e| MediaError::ThumbnailGeneration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_thumbnail_error() {
        let extractor = FfmpegFrameExtractor::with_binary("/nonexistent/ffmpeg-binary");
        let err = extractor
            .extract_frame(Path::new("/tmp/clip.mp4"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ThumbnailGeneration(_)));
    }
}
