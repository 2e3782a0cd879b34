// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Shared fixtures: stub collaborators and cache constructors.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbImage};

use media_cache::{FrameExtractor, MediaCache, MediaCacheConfig, MediaError, MediaFetcher};

/// Fetcher returning a fixed payload (or error) and counting calls.
pub struct CountingFetcher {
    payload: Result<Vec<u8>, String>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn ok(payload: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            payload: Ok(payload),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            payload: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for CountingFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload.clone().map_err(MediaError::Fetch)
    }
}

/// Frame extractor producing a solid frame of fixed size, or failing.
/// Optionally sleeps first, to hold a lookup in the middle of a rebuild.
pub struct StubFrames {
    size: Option<(u32, u32)>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl StubFrames {
    pub fn solid(width: u32, height: u32) -> Arc<Self> {
        Self::slow(width, height, Duration::ZERO)
    }

    pub fn slow(width: u32, height: u32, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            size: Some((width, height)),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            size: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl FrameExtractor for StubFrames {
    async fn extract_frame(&self, _video: &Path, _at: Duration) -> Result<DynamicImage, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.size {
            Some((w, h)) => Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, image::Rgb([10, 120, 200])))),
            None => Err(MediaError::ThumbnailGeneration("decoder unavailable".into())),
        }
    }
}

/// JPEG bytes of a gradient image.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

/// Defaults with the cleanup cooldown disabled so every pass scans.
pub fn test_config() -> MediaCacheConfig {
    MediaCacheConfig {
        cleanup_cooldown_secs: 0,
        ..Default::default()
    }
}

pub async fn open_cache(root: &Path, config: MediaCacheConfig) -> MediaCache {
    open_cache_with(root, config, CountingFetcher::failing("offline"), StubFrames::solid(640, 360)).await
}

pub async fn open_cache_with(
    root: &Path,
    config: MediaCacheConfig,
    fetcher: Arc<dyn MediaFetcher>,
    frames: Arc<dyn FrameExtractor>,
) -> MediaCache {
    let cache = MediaCache::open_with(config, root, fetcher, frames).await.unwrap();
    // Drain the startup pass so tests start from a known cleanup state
    cache.run_cleanup().await.unwrap();
    cache
}

/// Write `size` raw bytes at `relative` under `root`.
pub async fn write_raw(root: &Path, relative: &str, size: usize) {
    let file = root.join(relative);
    tokio::fs::create_dir_all(file.parent().unwrap()).await.unwrap();
    tokio::fs::write(file, vec![0u8; size]).await.unwrap();
}

pub const HOUR_MS: u64 = 3600 * 1000;
pub const DAY_MS: u64 = 24 * HOUR_MS;

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}
