// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tiered rendition cache.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Memory tier         LRU, bounded by count and decoded bytes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ miss
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Disk tier           ThumbCache/ (list) or DisplayCache/     │
//! │                      decode → promote to memory              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ miss
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Origin              DiaryMedia/, Thumbnails/ (durable)      │
//! │                      decode → downscale → disk + memory      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every lookup is best-effort: failures are logged and degrade to the next
//! tier or to `None`, never to an error.
//!
//! Memory hits are lock-free. Anything that writes a tier or the access log
//! on behalf of a lookup holds the per-path lock, the same one deletion and
//! eviction take, so a finished delete is never undone by a lookup that
//! started before it.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;
use tracing::{debug, warn};

use crate::access_log::AccessLog;
use crate::config::MediaCacheConfig;
use crate::imaging;
use crate::layout::{self, StorageLayout};
use crate::locks::PathLocks;
use crate::media::{MediaKind, Rendition, RenditionKind};
use crate::storage::{DiskTier, FrameExtractor, MemoryTier};

/// Memory tier + two disk tiers in front of the durable origin files.
pub struct TieredCache {
    layout: StorageLayout,
    memory: MemoryTier,
    list_tier: DiskTier,
    display_tier: DiskTier,
    access_log: Arc<AccessLog>,
    locks: Arc<PathLocks>,
    frames: Arc<dyn FrameExtractor>,
    frame_offset: Duration,
}

impl TieredCache {
    pub fn new(
        config: &MediaCacheConfig,
        layout: StorageLayout,
        access_log: Arc<AccessLog>,
        locks: Arc<PathLocks>,
        frames: Arc<dyn FrameExtractor>,
    ) -> Self {
        let list_tier = DiskTier::new(
            RenditionKind::List,
            layout.list_cache_dir(),
            config.list_rendition_px,
            config.list_quality,
        );
        let display_tier = DiskTier::new(
            RenditionKind::Display,
            layout.display_cache_dir(),
            config.display_rendition_px,
            config.display_quality,
        );
        Self {
            memory: MemoryTier::new(config.memory_max_entries, config.memory_max_bytes),
            list_tier,
            display_tier,
            layout,
            access_log,
            locks,
            frames,
            frame_offset: config.video_frame_offset(),
        }
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    #[must_use]
    pub fn disk_tier(&self, kind: RenditionKind) -> &DiskTier {
        match kind {
            RenditionKind::List => &self.list_tier,
            RenditionKind::Display => &self.display_tier,
        }
    }

    /// Memory-only lookup. No I/O; safe on a synchronous path.
    pub fn peek(&self, path: &str, kind: RenditionKind) -> Option<Rendition> {
        let hit = self.memory.get(kind, path);
        if hit.is_some() {
            self.access_log.touch(path);
            crate::metrics::record_operation("memory", "peek", "hit");
        } else {
            crate::metrics::record_operation("memory", "peek", "miss");
        }
        hit
    }

    /// Full lookup: memory → disk tier → origin.
    ///
    /// Only paths inside the durable directories are served.
    #[tracing::instrument(skip(self), fields(tier))]
    pub async fn rendition(&self, path: &str, kind: RenditionKind) -> Option<Rendition> {
        let start = Instant::now();

        // 1. Memory
        if let Some(hit) = self.memory_hit(path, kind) {
            return Some(hit);
        }

        let file = match self.layout.resolve_durable(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "Rejected rendition request");
                return None;
            }
        };
        let _guard = self.locks.lock(path).await;

        // Another lookup may have populated memory while we waited
        if let Some(hit) = self.memory_hit(path, kind) {
            return Some(hit);
        }

        // 2. Disk tier
        let disk = self.disk_tier(kind);
        if let Some(bytes) = disk.read(path).await {
            match imaging::blocking(move || imaging::decode(&bytes)).await {
                Ok(img) => {
                    let rendition = Rendition::new(img);
                    self.memory.insert(kind, path, rendition.clone());
                    self.access_log.touch(path);
                    tracing::Span::current().record("tier", disk.label());
                    debug!("Disk tier hit, promoted to memory");
                    crate::metrics::record_operation(disk.label(), "get", "hit");
                    crate::metrics::record_latency(disk.label(), "get", start.elapsed());
                    return Some(rendition);
                }
                Err(e) => {
                    // Corrupt cache file; drop it and regenerate below
                    warn!(error = %e, "Discarding undecodable rendition");
                    crate::metrics::record_error(disk.label(), "get", "corrupt");
                    if let Err(e) = disk.remove(path).await {
                        warn!(tier = disk.label(), error = %e, "Failed to remove corrupt rendition");
                        crate::metrics::record_error(disk.label(), "evict", e.kind());
                    }
                }
            }
        } else {
            crate::metrics::record_operation(disk.label(), "get", "miss");
        }

        // 3. Origin
        let origin = self.decode_origin(path, &file).await?;
        // Removed behind our back while decoding; populating now would leak
        if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            debug!("Origin vanished during rebuild");
            crate::metrics::record_operation("origin", "get", "miss");
            return None;
        }
        let rendition = self.store(path, kind, origin).await?;
        self.access_log.touch(path);
        tracing::Span::current().record("tier", "origin");
        debug!("Regenerated rendition from origin");
        crate::metrics::record_operation("origin", "get", "hit");
        crate::metrics::record_latency("origin", "get", start.elapsed());
        Some(rendition)
    }

    fn memory_hit(&self, path: &str, kind: RenditionKind) -> Option<Rendition> {
        let hit = self.memory.get(kind, path)?;
        self.access_log.touch(path);
        tracing::Span::current().record("tier", "memory");
        crate::metrics::record_operation("memory", "get", "hit");
        Some(hit)
    }

    /// Downscale `source` for `kind`, write the disk tier (best effort) and
    /// insert into memory. Does not touch the access log.
    ///
    /// `None` only if the image worker itself died.
    pub async fn store(&self, path: &str, kind: RenditionKind, source: DynamicImage) -> Option<Rendition> {
        let disk = self.disk_tier(kind);
        let max_side = disk.max_side();
        let quality = disk.quality();

        let (scaled, encoded) = match imaging::blocking(move || {
            let scaled = imaging::downscale(source, max_side);
            let encoded = imaging::encode_jpeg(&scaled, quality);
            Ok((scaled, encoded))
        })
        .await
        {
            Ok(work) => work,
            Err(e) => {
                warn!(path, error = %e, "Rendition worker failed");
                crate::metrics::record_error(disk.label(), "put", e.kind());
                return None;
            }
        };

        match encoded {
            Ok(bytes) => {
                if let Err(e) = disk.write(path, &bytes).await {
                    warn!(path, tier = disk.label(), error = %e, "Rendition write failed, serving from memory only");
                    crate::metrics::record_error(disk.label(), "put", e.kind());
                }
            }
            Err(e) => {
                warn!(path, error = %e, "Rendition encode failed, serving from memory only");
                crate::metrics::record_error(disk.label(), "put", e.kind());
            }
        }

        let rendition = Rendition::new(scaled);
        self.memory.insert(kind, path, rendition.clone());
        Some(rendition)
    }

    /// Populate both renditions of `path` from an already decoded image and
    /// touch the access log. Returns the display rendition.
    pub async fn warm(&self, path: &str, source: DynamicImage) -> Option<Rendition> {
        let display = self.store(path, RenditionKind::Display, source).await?;
        // The list rendition is derived from the (smaller) display pixels
        self.store(path, RenditionKind::List, display.image().clone()).await;
        self.access_log.touch(path);
        Some(display)
    }

    /// Remove every cached rendition of `path`: both memory namespaces and
    /// both disk files.
    pub async fn evict(&self, path: &str) {
        self.memory.remove_path(path);
        for disk in [&self.list_tier, &self.display_tier] {
            if let Err(e) = disk.remove(path).await {
                warn!(path, tier = disk.label(), error = %e, "Failed to remove rendition");
                crate::metrics::record_error(disk.label(), "evict", e.kind());
            }
        }
        crate::metrics::record_operation("all", "evict", "success");
    }

    /// Drop everything cached (memory and both disk tiers).
    pub async fn clear(&self) {
        self.memory.clear();
        for disk in [&self.list_tier, &self.display_tier] {
            if let Err(e) = disk.clear().await {
                warn!(tier = disk.label(), error = %e, "Failed to clear rendition tier");
            }
        }
    }

    /// Bytes held by the two reclaimable rendition directories.
    pub async fn disk_bytes(&self) -> u64 {
        layout::total_bytes(&self.layout.rendition_dirs()).await
    }

    async fn decode_origin(&self, path: &str, file: &Path) -> Option<DynamicImage> {
        match MediaKind::from_path(path) {
            MediaKind::Video => self.decode_video_origin(file).await,
            MediaKind::Image => {
                let bytes = match tokio::fs::read(file).await {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        debug!("Origin missing");
                        crate::metrics::record_operation("origin", "get", "miss");
                        return None;
                    }
                    Err(e) => {
                        warn!(error = %e, "Origin read failed");
                        crate::metrics::record_error("origin", "get", "io");
                        return None;
                    }
                };
                crate::metrics::record_bytes_read("origin", bytes.len());
                match imaging::blocking(move || imaging::decode(&bytes)).await {
                    Ok(img) => Some(img),
                    Err(e) => {
                        warn!(error = %e, "Origin is not a decodable image");
                        crate::metrics::record_error("origin", "get", "decode");
                        None
                    }
                }
            }
        }
    }

    async fn decode_video_origin(&self, file: &Path) -> Option<DynamicImage> {
        if !tokio::fs::try_exists(file).await.unwrap_or(false) {
            crate::metrics::record_operation("origin", "get", "miss");
            return None;
        }
        match self.frames.extract_frame(file, self.frame_offset).await {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "Frame extraction failed");
                crate::metrics::record_error("origin", "get", "frame");
                None
            }
        }
    }
}
