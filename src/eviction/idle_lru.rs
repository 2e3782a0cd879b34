// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::time::Duration;

/// A durable file considered for eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionCandidate {
    /// Relative path (cache key)
    pub path: String,
    pub size_bytes: u64,
    /// Last access (unix millis) from the access log, or file mtime if unlogged
    pub last_access_ms: u64,
}

impl EvictionCandidate {
    pub fn new(path: impl Into<String>, size_bytes: u64, last_access_ms: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            last_access_ms,
        }
    }

    #[must_use]
    pub fn idle_for(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.last_access_ms))
    }

    #[must_use]
    pub fn is_idle(&self, now_ms: u64, threshold: Duration) -> bool {
        self.idle_for(now_ms) > threshold
    }
}

/// Idle-first LRU ordering.
///
/// Files idle longer than the threshold come first (oldest access first),
/// then every active file (oldest access first). An idle file always precedes
/// an active one regardless of relative staleness.
#[derive(Debug, Clone, Copy)]
pub struct IdleFirstPolicy {
    pub idle_threshold: Duration,
}

impl IdleFirstPolicy {
    #[must_use]
    pub fn new(idle_threshold: Duration) -> Self {
        Self { idle_threshold }
    }

    /// Order every candidate into one eviction queue.
    #[must_use]
    pub fn queue(&self, candidates: Vec<EvictionCandidate>, now_ms: u64) -> Vec<EvictionCandidate> {
        let (mut idle, mut active): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| c.is_idle(now_ms, self.idle_threshold));

        // Path breaks ties so the order is deterministic
        let by_age = |a: &EvictionCandidate, b: &EvictionCandidate| {
            a.last_access_ms
                .cmp(&b.last_access_ms)
                .then_with(|| a.path.cmp(&b.path))
        };
        idle.sort_by(by_age);
        active.sort_by(by_age);

        idle.extend(active);
        idle
    }

    /// Walk the queue from the front, taking files until `total_bytes` minus
    /// the taken sizes is at or below `target_bytes`.
    ///
    /// Used for planning and dry runs; the scheduler performs the same walk
    /// while deleting, so files it fails to delete don't count.
    #[must_use]
    pub fn select_victims(
        &self,
        candidates: Vec<EvictionCandidate>,
        now_ms: u64,
        total_bytes: u64,
        target_bytes: u64,
    ) -> Vec<EvictionCandidate> {
        let mut remaining = total_bytes;
        let mut victims = Vec::new();
        for candidate in self.queue(candidates, now_ms) {
            if remaining <= target_bytes {
                break;
            }
            remaining = remaining.saturating_sub(candidate.size_bytes);
            victims.push(candidate);
        }
        victims
    }
}
