// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the media cache coordinator.

/// Cache lifecycle state.
///
/// Use [`super::MediaCache::state()`] to check the current state or
/// [`super::MediaCache::state_receiver()`] to watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Directories exist, access log loaded, cleanup worker running
    Ready,
    /// `shutdown()` in progress
    ShuttingDown,
    /// Cleanup worker stopped and access log flushed
    Stopped,
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Point-in-time view of the in-memory state. Cheap; does no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub state: CacheState,
    /// Renditions held by the memory tier (both namespaces)
    pub memory_entries: usize,
    /// Decoded bytes held by the memory tier
    pub memory_bytes: usize,
    pub access_log_entries: usize,
    /// Unix millis of the last cleanup pass that got past its cooldown gate
    pub last_cleanup_ms: Option<u64>,
}
