// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! A single cleanup pass.
//!
//! 1. Cooldown gate against the persisted last-run timestamp
//! 2. Measure `DiaryMedia/` + `Thumbnails/`, dropping access-log entries
//!    whose file is gone
//! 3. Rank files idle-first, then LRU (see [`IdleFirstPolicy`])
//! 4. Delete from the front of the queue until usage ≤ target floor
//!
//! Nothing here returns an error: failures are logged and counted, and the
//! next trigger simply tries again.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{CleanupOutcome, CleanupReport};
use crate::access_log::{now_millis, AccessLog};
use crate::config::StorageBudget;
use crate::eviction::{EvictionCandidate, IdleFirstPolicy};
use crate::layout::{self, write_file_atomic, StorageLayout};
use crate::locks::PathLocks;
use crate::tiered::TieredCache;

/// Persisted in `media_cache_state.json`.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
struct CleanupState {
    #[serde(default)]
    last_cleanup_ms: Option<u64>,
}

pub struct CleanupScheduler {
    layout: StorageLayout,
    budget: StorageBudget,
    policy: IdleFirstPolicy,
    tiers: Arc<TieredCache>,
    access_log: Arc<AccessLog>,
    locks: Arc<PathLocks>,
    state: Mutex<CleanupState>,
}

impl CleanupScheduler {
    /// Build a scheduler, restoring the last-run timestamp from disk.
    pub async fn load(
        layout: StorageLayout,
        budget: StorageBudget,
        tiers: Arc<TieredCache>,
        access_log: Arc<AccessLog>,
        locks: Arc<PathLocks>,
    ) -> Self {
        let state = load_state(&layout).await;
        Self {
            policy: IdleFirstPolicy::new(budget.idle_threshold),
            layout,
            budget,
            tiers,
            access_log,
            locks,
            state: Mutex::new(state),
        }
    }

    #[must_use]
    pub fn budget(&self) -> &StorageBudget {
        &self.budget
    }

    /// Timestamp (unix millis) of the last pass that got past the cooldown gate.
    #[must_use]
    pub fn last_cleanup_ms(&self) -> Option<u64> {
        self.state.lock().last_cleanup_ms
    }

    /// Forget the last run so the next pass is not gated.
    pub fn reset_cooldown(&self) {
        self.state.lock().last_cleanup_ms = None;
    }

    /// Run one pass. Callers serialize passes (see [`super::CleanupWorker`]).
    #[tracing::instrument(skip(self), fields(outcome))]
    pub async fn run_pass(&self) -> CleanupReport {
        let start = Instant::now();
        let now = now_millis();

        if self.in_cooldown(now) {
            debug!("Cleanup skipped: cooldown");
            let report = CleanupReport::cooldown(start.elapsed());
            self.finish(&report);
            return report;
        }

        self.state.lock().last_cleanup_ms = Some(now);
        self.persist_state().await;

        let candidates = self.candidates().await;
        let usage: u64 = candidates.iter().map(|c| c.size_bytes).sum();
        crate::metrics::set_durable_storage_bytes(usage);
        self.prune_access_log(&candidates);

        if usage <= self.budget.hard_cap_bytes {
            debug!(usage, cap = self.budget.hard_cap_bytes, "Durable storage under cap");
            self.access_log.persist_best_effort().await;
            let report = CleanupReport::under_cap(usage, start.elapsed());
            self.finish(&report);
            return report;
        }

        info!(
            usage,
            cap = self.budget.hard_cap_bytes,
            target = self.budget.target_floor_bytes,
            "Durable storage over cap, evicting"
        );

        let queue = self.policy.queue(candidates, now);
        let mut report = CleanupReport {
            outcome: CleanupOutcome::Evicted,
            usage_before: usage,
            usage_after: usage,
            ..CleanupReport::cooldown(start.elapsed())
        };

        for candidate in queue {
            if report.usage_after <= self.budget.target_floor_bytes {
                break;
            }
            let Some(_guard) = self.locks.try_lock(&candidate.path) else {
                debug!(path = %candidate.path, "Skipping busy file");
                report.skipped_busy += 1;
                continue;
            };
            if self.evict_file(&candidate).await {
                report.usage_after = report.usage_after.saturating_sub(candidate.size_bytes);
                report.bytes_freed += candidate.size_bytes;
                report.evicted.push(candidate.path);
            } else {
                report.failed += 1;
            }
        }

        self.locks.prune();
        self.access_log.persist_best_effort().await;
        crate::metrics::set_durable_storage_bytes(report.usage_after);
        crate::metrics::record_eviction(report.evicted.len(), report.bytes_freed);

        if report.usage_after > self.budget.target_floor_bytes {
            warn!(
                remaining = report.usage_after,
                target = self.budget.target_floor_bytes,
                skipped_busy = report.skipped_busy,
                failed = report.failed,
                "Cleanup could not reach target floor"
            );
        }
        info!(
            evicted = report.evicted.len(),
            bytes_freed = report.bytes_freed,
            remaining = report.usage_after,
            "Cleanup pass complete"
        );

        report.duration = start.elapsed();
        self.finish(&report);
        report
    }

    fn in_cooldown(&self, now: u64) -> bool {
        let cooldown_ms = self.budget.cooldown.as_millis() as u64;
        match self.state.lock().last_cleanup_ms {
            Some(last) => now.saturating_sub(last) < cooldown_ms,
            None => false,
        }
    }

    /// Every durable file, stamped with its logged access time or, if the
    /// log has never seen it, its modification time.
    async fn candidates(&self) -> Vec<EvictionCandidate> {
        let mut candidates = Vec::new();
        for dir in self.layout.durable_dirs() {
            for file in layout::list_files(&dir).await {
                let Some(relative) = self.layout.relative_of(&file.path) else {
                    continue;
                };
                let last_access = self
                    .access_log
                    .last_access(&relative)
                    .unwrap_or(file.modified_ms);
                candidates.push(EvictionCandidate::new(relative, file.size_bytes, last_access));
            }
        }
        candidates
    }

    /// Forget paths the scan didn't find. Busy paths are left alone: their
    /// owner may be about to create the file.
    fn prune_access_log(&self, candidates: &[EvictionCandidate]) {
        let live: HashSet<&str> = candidates.iter().map(|c| c.path.as_str()).collect();
        let pruned = self
            .access_log
            .retain(|path| live.contains(path) || self.locks.try_lock(path).is_none());
        self.locks.prune();
        if pruned > 0 {
            debug!(pruned, "Dropped access-log entries for missing files");
        }
    }

    async fn evict_file(&self, candidate: &EvictionCandidate) -> bool {
        let file = match self.layout.resolve(&candidate.path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %candidate.path, error = %e, "Unresolvable eviction candidate");
                return false;
            }
        };
        // Already gone counts as deleted
        if let Err(e) = layout::remove_file_if_exists(&file).await {
            warn!(path = %candidate.path, error = %e, "Failed to evict file");
            crate::metrics::record_error("origin", "evict", e.kind());
            return false;
        }
        self.tiers.evict(&candidate.path).await;
        self.access_log.remove(&candidate.path);
        debug!(path = %candidate.path, bytes = candidate.size_bytes, "Evicted");
        true
    }

    async fn persist_state(&self) {
        let state = *self.state.lock();
        let path = self.layout.cache_state_file();
        let result = match serde_json::to_vec_pretty(&state) {
            Ok(bytes) => write_file_atomic(&path, &bytes).await,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cleanup state");
                return;
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cleanup state");
            crate::metrics::record_error("cleanup", "persist_state", e.kind());
        }
    }

    fn finish(&self, report: &CleanupReport) {
        tracing::Span::current().record("outcome", report.outcome.as_str());
        crate::metrics::record_cleanup_pass(report.outcome.as_str(), report.duration);
    }
}

async fn load_state(layout: &StorageLayout) -> CleanupState {
    let path = layout.cache_state_file();
    match tokio::fs::read(&path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Cleanup state is corrupt, ignoring");
            CleanupState::default()
        }),
        Err(_) => CleanupState::default(),
    }
}
