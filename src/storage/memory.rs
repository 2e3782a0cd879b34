// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use lru::LruCache;
use parking_lot::Mutex;

use crate::media::{Rendition, RenditionKind};

/// Memory tier key. List and display renditions of the same path live in
/// separate namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryKey {
    pub kind: RenditionKind,
    pub path: String,
}

impl MemoryKey {
    pub fn new(kind: RenditionKind, path: &str) -> Self {
        Self {
            kind,
            path: path.to_string(),
        }
    }
}

struct Inner {
    lru: LruCache<MemoryKey, Rendition>,
    cost_bytes: usize,
}

/// Bounded in-memory rendition cache.
///
/// Bounded by entry count and by total decoded bytes; least recently used
/// entries go first when either bound is exceeded. Safe to share between
/// tasks without external locking. Never authoritative.
pub struct MemoryTier {
    inner: Mutex<Inner>,
    max_entries: usize,
    max_cost_bytes: usize,
}

impl MemoryTier {
    #[must_use]
    pub fn new(max_entries: usize, max_cost_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                lru: LruCache::unbounded(),
                cost_bytes: 0,
            }),
            max_entries: max_entries.max(1),
            max_cost_bytes,
        }
    }

    /// Look up and mark as recently used.
    pub fn get(&self, kind: RenditionKind, path: &str) -> Option<Rendition> {
        let key = MemoryKey::new(kind, path);
        self.inner.lock().lru.get(&key).cloned()
    }

    /// Whether an entry is resident, without touching recency.
    #[must_use]
    pub fn contains(&self, kind: RenditionKind, path: &str) -> bool {
        self.inner.lock().lru.contains(&MemoryKey::new(kind, path))
    }

    /// Insert (or replace) an entry, then evict until both bounds hold.
    ///
    /// An entry costing more than the whole byte budget is not cached.
    pub fn insert(&self, kind: RenditionKind, path: &str, rendition: Rendition) {
        let cost = rendition.cost_bytes();
        let key = MemoryKey::new(kind, path);
        let mut inner = self.inner.lock();

        if cost > self.max_cost_bytes {
            if let Some(old) = inner.lru.pop(&key) {
                inner.cost_bytes = inner.cost_bytes.saturating_sub(old.cost_bytes());
            }
            return;
        }

        if let Some((_, old)) = inner.lru.push(key, rendition) {
            inner.cost_bytes = inner.cost_bytes.saturating_sub(old.cost_bytes());
        }
        inner.cost_bytes += cost;

        let mut evicted = 0;
        while inner.lru.len() > self.max_entries || inner.cost_bytes > self.max_cost_bytes {
            match inner.lru.pop_lru() {
                Some((_, old)) => {
                    inner.cost_bytes = inner.cost_bytes.saturating_sub(old.cost_bytes());
                    evicted += 1;
                }
                None => break,
            }
        }

        crate::metrics::set_memory_tier_items(inner.lru.len());
        crate::metrics::set_memory_tier_bytes(inner.cost_bytes);
        if evicted > 0 {
            crate::metrics::record_memory_eviction(evicted);
        }
    }

    /// Drop both namespaces for `path`. Returns how many entries went.
    pub fn remove_path(&self, path: &str) -> usize {
        let mut inner = self.inner.lock();
        let mut removed = 0;
        for kind in [RenditionKind::List, RenditionKind::Display] {
            if let Some(old) = inner.lru.pop(&MemoryKey::new(kind, path)) {
                inner.cost_bytes = inner.cost_bytes.saturating_sub(old.cost_bytes());
                removed += 1;
            }
        }
        if removed > 0 {
            crate::metrics::set_memory_tier_items(inner.lru.len());
            crate::metrics::set_memory_tier_bytes(inner.cost_bytes);
        }
        removed
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.cost_bytes = 0;
        crate::metrics::set_memory_tier_items(0);
        crate::metrics::set_memory_tier_bytes(0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    #[must_use]
    pub fn cost_bytes(&self) -> usize {
        self.inner.lock().cost_bytes
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new(200, 100 * 1024 * 1024)
    }
}
