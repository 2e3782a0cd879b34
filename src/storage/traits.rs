// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::MediaError;

/// Downloads raw media bytes. Retry and backoff belong to the implementor
/// (or whatever wraps it), never to the cache.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError>;
}

/// Pulls a representative still frame out of a video file.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Decode the frame nearest to `at`. Implementations fall back to the
    /// first frame when the clip is shorter than `at`.
    async fn extract_frame(&self, video: &Path, at: Duration) -> Result<DynamicImage, MediaError>;
}
