// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Decode, downscale and encode helpers.
//!
//! These are CPU-bound; async callers run them through [`blocking`] so they
//! never stall an executor thread.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::MediaError;

/// Decode any supported still-image format.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, MediaError> {
    image::load_from_memory(bytes).map_err(|e| MediaError::InvalidPayload(e.to_string()))
}

/// Shrink `img` so its longest side is `max_side`, preserving aspect ratio.
///
/// Images already at or below `max_side` are returned untouched; this never
/// upscales.
#[must_use]
pub fn downscale(img: DynamicImage, max_side: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    if w.max(h) <= max_side {
        return img;
    }
    let (nw, nh) = scaled_dimensions(w, h, max_side);
    img.resize_exact(nw, nh, FilterType::Triangle)
}

/// Target dimensions for [`downscale`]. The longest side becomes exactly
/// `max_side`; the other side is rounded and never drops below 1.
#[must_use]
pub fn scaled_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    let shrink = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_side);
    if width >= height {
        (max_side, shrink(height))
    } else {
        (shrink(width), max_side)
    }
}

/// Encode as baseline JPEG. Alpha is dropped since JPEG cannot carry it.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, MediaError> {
    let rgb = img.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| MediaError::ThumbnailGeneration(e.to_string()))?;
    Ok(out.into_inner())
}

/// Run CPU-bound work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, MediaError>
where
    F: FnOnce() -> Result<T, MediaError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| MediaError::ThumbnailGeneration(format!("image worker failed: {e}")))?
}
