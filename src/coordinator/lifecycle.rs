// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache lifecycle: open, cleanup control, reset, shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::access_log::AccessLog;
use crate::cleanup::{CleanupReport, CleanupScheduler, CleanupWorker};
use crate::config::MediaCacheConfig;
use crate::error::MediaError;
use crate::ingest::MediaIngest;
use crate::layout::StorageLayout;
use crate::locks::PathLocks;
use crate::storage::{FfmpegFrameExtractor, FrameExtractor, HttpFetcher, MediaFetcher};
use crate::tiered::TieredCache;

use super::{CacheState, MediaCache};

impl MediaCache {
    /// Open the cache under `root` with the default collaborators: an HTTP
    /// fetcher and the `ffmpeg` binary for video frames.
    pub async fn open(config: MediaCacheConfig, root: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let fetcher = Arc::new(HttpFetcher::new()?);
        let frames = Arc::new(FfmpegFrameExtractor::new());
        Self::open_with(config, root, fetcher, frames).await
    }

    /// Open the cache with injected collaborators.
    ///
    /// Startup:
    /// 1. Validate the config
    /// 2. Create the four media directories
    /// 3. Load the access log (missing or corrupt → empty)
    /// 4. Restore the cleanup state and spawn the cleanup worker
    /// 5. Queue the startup cleanup pass
    ///
    /// Must be called from within a Tokio runtime.
    #[tracing::instrument(skip_all, fields(root))]
    pub async fn open_with(
        config: MediaCacheConfig,
        root: impl Into<PathBuf>,
        fetcher: Arc<dyn MediaFetcher>,
        frames: Arc<dyn FrameExtractor>,
    ) -> Result<Self, MediaError> {
        let root = root.into();
        tracing::Span::current().record("root", tracing::field::display(root.display()));

        if let Err(e) = config.validate() {
            error!(error = %e, "Rejected media cache config");
            return Err(e);
        }

        let layout = StorageLayout::new(root);
        if let Err(e) = layout.ensure_dirs().await {
            error!(error = %e, "Failed to create media directories");
            crate::metrics::record_error("origin", "open", e.kind());
            return Err(e);
        }

        let access_log = Arc::new(AccessLog::load(layout.access_log_file()).await);
        let locks = Arc::new(PathLocks::new());
        let tiers = Arc::new(TieredCache::new(
            &config,
            layout.clone(),
            access_log.clone(),
            locks.clone(),
            frames.clone(),
        ));
        let ingest = MediaIngest::new(&config, layout.clone(), frames);
        let scheduler = Arc::new(
            CleanupScheduler::load(
                layout.clone(),
                config.budget(),
                tiers.clone(),
                access_log.clone(),
                locks.clone(),
            )
            .await,
        );
        let cleanup = CleanupWorker::spawn(scheduler.clone());
        let (state, state_rx) = watch::channel(CacheState::Ready);

        info!(
            access_log_entries = access_log.len(),
            hard_cap_bytes = config.hard_cap_bytes,
            "Media cache ready"
        );

        let cache = Self {
            config,
            layout,
            access_log,
            tiers,
            ingest,
            fetcher,
            locks,
            scheduler,
            cleanup,
            state,
            state_rx,
        };
        cache.cleanup.trigger();
        Ok(cache)
    }

    /// Persist the access log now. Call when the host app goes to the
    /// background. Best-effort: returns whether the write succeeded.
    pub async fn flush_access_log(&self) -> bool {
        self.access_log.persist_best_effort().await
    }

    /// Run a cleanup pass and wait for its report.
    ///
    /// Returns `None` after shutdown.
    pub async fn run_cleanup(&self) -> Option<CleanupReport> {
        self.cleanup.run_now().await
    }

    /// Queue a cleanup pass without waiting.
    pub fn schedule_cleanup(&self) {
        self.cleanup.trigger();
    }

    /// Drop every decoded rendition held in memory. Disk tiers are untouched.
    pub fn handle_memory_pressure(&self) {
        let memory = self.tiers.memory();
        let dropped = memory.len();
        memory.clear();
        info!(dropped, "Memory tier cleared under memory pressure");
    }

    /// Delete every stored file and forget every access. Debug/reset only.
    #[tracing::instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<(), MediaError> {
        self.tiers.clear().await;
        for dir in self.layout.durable_dirs() {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    let e = MediaError::Io { path: dir, source };
                    error!(error = %e, "Failed to clear media directory");
                    return Err(e);
                }
            }
        }
        self.layout.ensure_dirs().await?;
        self.access_log.clear();
        self.access_log.persist().await?;
        self.scheduler.reset_cooldown();
        self.locks.prune();
        crate::metrics::set_durable_storage_bytes(0);
        warn!("All media cleared");
        Ok(())
    }

    /// Stop the cleanup worker (queued passes finish first), flush the access
    /// log and release the memory tier.
    pub async fn shutdown(&self) {
        if self.state() != CacheState::Ready {
            return;
        }
        info!("Shutting down media cache");
        let _ = self.state.send(CacheState::ShuttingDown);

        self.cleanup.shutdown().await;
        if !self.access_log.persist_best_effort().await {
            warn!("Access log not persisted on shutdown");
        }
        self.tiers.memory().clear();

        let _ = self.state.send(CacheState::Stopped);
        info!("Media cache stopped");
    }
}
