// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Media cache coordinator.
//!
//! The [`MediaCache`] ties the components together:
//! - Ingest of originals and thumbnails ([`crate::ingest`])
//! - Memory + disk rendition tiers ([`crate::tiered`])
//! - The persisted access log ([`crate::access_log`])
//! - Background cleanup bounding durable storage ([`crate::cleanup`])
//! - Remote fetch for media not present locally
//!
//! # Lifecycle
//!
//! ```text
//! open() → Ready → shutdown() → ShuttingDown → Stopped
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use media_cache::{MediaCache, MediaCacheConfig, MediaId};
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), media_cache::MediaError> {
//! let cache = MediaCache::open(MediaCacheConfig::default(), "/data/app").await?;
//!
//! let saved = cache.save_image(bytes, MediaId::new()).await?;
//! let list = cache.cached_list_rendition(&saved.original_path).await;
//! assert!(list.is_some());
//!
//! cache.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod types;
mod api;
mod fetch;
mod lifecycle;

pub use types::{CacheState, CacheStats};

use std::sync::Arc;

use tokio::sync::watch;

use crate::access_log::AccessLog;
use crate::cleanup::{CleanupScheduler, CleanupWorker};
use crate::config::MediaCacheConfig;
use crate::ingest::MediaIngest;
use crate::layout::StorageLayout;
use crate::locks::PathLocks;
use crate::storage::MediaFetcher;
use crate::tiered::TieredCache;

/// Entry point for everything media: save, look up, fetch, delete, clean up.
///
/// One instance per storage root. Share it by reference or `Arc`; every
/// method takes `&self`.
pub struct MediaCache {
    config: MediaCacheConfig,
    layout: StorageLayout,
    access_log: Arc<AccessLog>,
    tiers: Arc<TieredCache>,
    ingest: MediaIngest,
    fetcher: Arc<dyn MediaFetcher>,
    locks: Arc<PathLocks>,
    scheduler: Arc<CleanupScheduler>,
    cleanup: CleanupWorker,
    state: watch::Sender<CacheState>,
    state_rx: watch::Receiver<CacheState>,
}

impl MediaCache {
    #[must_use]
    pub fn config(&self) -> &MediaCacheConfig {
        &self.config
    }

    #[must_use]
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    #[must_use]
    pub fn access_log(&self) -> &AccessLog {
        &self.access_log
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        *self.state_rx.borrow()
    }

    /// Watch lifecycle transitions.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<CacheState> {
        self.state_rx.clone()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let memory = self.tiers.memory();
        CacheStats {
            state: self.state(),
            memory_entries: memory.len(),
            memory_bytes: memory.cost_bytes(),
            access_log_entries: self.access_log.len(),
            last_cleanup_ms: self.scheduler.last_cleanup_ms(),
        }
    }
}
