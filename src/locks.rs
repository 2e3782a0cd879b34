// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-path write locks.
//!
//! Ingest, explicit deletion, remote origin writes, rendition population and
//! eviction all take the lock for the relative path they touch. A cleanup
//! pass can never delete a file while it is being (re)written, and a lookup
//! can never repopulate a path after its delete finished. Eviction only ever
//! `try_lock`s and skips busy paths.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub type PathGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct PathLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PathLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, path: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `path`.
    pub async fn lock(&self, path: &str) -> PathGuard {
        self.slot(path).lock_owned().await
    }

    /// Lock several paths in a fixed order so two callers can't deadlock.
    pub async fn lock_all(&self, paths: &[&str]) -> Vec<PathGuard> {
        let mut sorted: Vec<&str> = paths.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for path in sorted {
            guards.push(self.lock(path).await);
        }
        guards
    }

    /// Exclusive access to `path` if nobody holds it right now.
    pub fn try_lock(&self, path: &str) -> Option<PathGuard> {
        self.slot(path).try_lock_owned().ok()
    }

    /// Drop slots nobody is holding or waiting on.
    pub fn prune(&self) {
        self.locks.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_try_lock_fails_while_held() {
        let locks = PathLocks::new();
        let guard = locks.lock("DiaryMedia/a.jpg").await;
        assert!(locks.try_lock("DiaryMedia/a.jpg").is_none());
        assert!(locks.try_lock("DiaryMedia/b.jpg").is_some());
        drop(guard);
        assert!(locks.try_lock("DiaryMedia/a.jpg").is_some());
    }

    #[tokio::test]
    async fn test_lock_all_dedups_and_orders() {
        let locks = PathLocks::new();
        let guards = locks.lock_all(&["b", "a", "b"]).await;
        assert_eq!(guards.len(), 2);
        assert!(locks.try_lock("a").is_none());
        assert!(locks.try_lock("b").is_none());
    }

    #[tokio::test]
    async fn test_prune_keeps_held_slots() {
        let locks = PathLocks::new();
        let held = locks.lock("held").await;
        drop(locks.lock("released").await);
        assert_eq!(locks.len(), 2);

        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
