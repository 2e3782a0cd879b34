// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Save, load, delete and rendition lookups.

use tracing::{debug, error, info, warn};

use crate::error::MediaError;
use crate::layout::{self, StorageLayout};
use crate::media::{MediaId, MediaKind, Rendition, RenditionKind, SavedMedia};
use crate::metrics::LatencyTimer;

use super::MediaCache;

impl MediaCache {
    // ═══════════════════════════════════════════════════════════════════════════
    // Ingest
    // ═══════════════════════════════════════════════════════════════════════════

    /// Save a photo: re-encoded original plus thumbnail.
    ///
    /// On success both paths are touched in the access log, the thumbnail is
    /// seeded into the memory and list-disk tiers, and a cleanup check is
    /// queued.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save_image(&self, bytes: Vec<u8>, id: MediaId) -> Result<SavedMedia, MediaError> {
        self.save(bytes, id, MediaKind::Image).await
    }

    /// Save a video verbatim plus a thumbnail from one of its frames.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save_video(&self, bytes: Vec<u8>, id: MediaId) -> Result<SavedMedia, MediaError> {
        self.save(bytes, id, MediaKind::Video).await
    }

    async fn save(&self, bytes: Vec<u8>, id: MediaId, kind: MediaKind) -> Result<SavedMedia, MediaError> {
        let _timer = LatencyTimer::new("origin", "save");
        let original_path = StorageLayout::original_path(&id, kind);
        let thumbnail_path = StorageLayout::thumbnail_path(&id);
        let guards = self
            .locks
            .lock_all(&[original_path.as_str(), thumbnail_path.as_str()])
            .await;

        let result = match kind {
            MediaKind::Image => self.ingest.save_image(bytes, id).await,
            MediaKind::Video => self.ingest.save_video(bytes, id).await,
        };
        let ingested = match result {
            Ok(ingested) => ingested,
            Err(e) => {
                error!(error = %e, "Media save failed");
                crate::metrics::record_operation("origin", "save", "error");
                crate::metrics::record_error("origin", "save", e.kind());
                return Err(e);
            }
        };

        let saved = ingested.saved;
        self.access_log.touch(&saved.original_path);
        self.access_log.touch(&saved.thumbnail_path);
        self.tiers
            .store(&saved.thumbnail_path, RenditionKind::List, ingested.thumbnail)
            .await;
        drop(guards);

        crate::metrics::record_operation("origin", "save", "success");
        info!(original = %saved.original_path, thumbnail = %saved.thumbnail_path, "Media saved");
        self.cleanup.trigger();
        Ok(saved)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Originals
    // ═══════════════════════════════════════════════════════════════════════════

    /// Raw bytes of a durable file. `None` if it doesn't exist, can't be
    /// read, or lies outside `DiaryMedia/` and `Thumbnails/`.
    #[tracing::instrument(skip(self))]
    pub async fn load_original(&self, path: &str) -> Option<Vec<u8>> {
        let file = match self.layout.resolve_durable(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "Rejected original request");
                return None;
            }
        };
        match tokio::fs::read(&file).await {
            Ok(bytes) => {
                self.access_log.touch(path);
                crate::metrics::record_operation("origin", "load", "hit");
                crate::metrics::record_bytes_read("origin", bytes.len());
                Some(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Original not found");
                crate::metrics::record_operation("origin", "load", "miss");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read original");
                crate::metrics::record_error("origin", "load", "io");
                None
            }
        }
    }

    /// Delete a durable file along with every rendition derived from it and
    /// its access-log entry. Deleting a missing file is a no-op; a path
    /// outside the durable directories is `InvalidPath`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_media(&self, path: &str) -> Result<(), MediaError> {
        let file = self.layout.resolve_durable(path)?;
        let guard = self.locks.lock(path).await;

        let existed = match layout::remove_file_if_exists(&file).await {
            Ok(existed) => existed,
            Err(e) => {
                error!(error = %e, "Failed to delete media");
                crate::metrics::record_error("origin", "delete", e.kind());
                return Err(e);
            }
        };
        self.tiers.evict(path).await;
        self.access_log.remove(path);
        drop(guard);

        crate::metrics::record_operation("origin", "delete", if existed { "success" } else { "missing" });
        debug!(existed, "Media deleted");
        Ok(())
    }

    /// Delete both files of a saved item.
    pub async fn delete_saved(&self, saved: &SavedMedia) -> Result<(), MediaError> {
        self.delete_media(&saved.original_path).await?;
        self.delete_media(&saved.thumbnail_path).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Renditions
    // ═══════════════════════════════════════════════════════════════════════════

    /// Small rendition for list cells: memory → `ThumbCache/` → origin.
    pub async fn cached_list_rendition(&self, path: &str) -> Option<Rendition> {
        self.tiers.rendition(path, RenditionKind::List).await
    }

    /// Large rendition for detail views: memory → `DisplayCache/` → origin.
    pub async fn cached_display_rendition(&self, path: &str) -> Option<Rendition> {
        self.tiers.rendition(path, RenditionKind::Display).await
    }

    /// Memory-only list lookup for synchronous layout passes.
    #[must_use]
    pub fn peek_list_rendition(&self, path: &str) -> Option<Rendition> {
        self.tiers.peek(path, RenditionKind::List)
    }

    /// Memory-only display lookup.
    #[must_use]
    pub fn peek_display_rendition(&self, path: &str) -> Option<Rendition> {
        self.tiers.peek(path, RenditionKind::Display)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Usage
    // ═══════════════════════════════════════════════════════════════════════════

    /// Bytes in `DiaryMedia/` + `Thumbnails/`, the figure held to the cap.
    pub async fn total_durable_storage_bytes(&self) -> u64 {
        let total = layout::total_bytes(&self.layout.durable_dirs()).await;
        crate::metrics::set_durable_storage_bytes(total);
        total
    }

    /// Bytes in the rendition caches, which are not counted toward the cap.
    pub async fn total_rendition_cache_bytes(&self) -> u64 {
        self.tiers.disk_bytes().await
    }
}
