// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded durable storage.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Cleanup Module                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  scheduler.rs   - One pass: gate → measure → order → evict   │
//! │  └─ CleanupScheduler: owns the cooldown state                │
//! │  worker.rs      - Background task serializing passes         │
//! │  └─ CleanupWorker: fire-and-forget or awaitable triggers     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A pass only ever deletes from `DiaryMedia/` and `Thumbnails/`. Rendition
//! caches are purged alongside the files they were derived from but are not
//! counted toward the cap.

pub mod scheduler;
pub mod worker;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use scheduler::CleanupScheduler;
pub use worker::CleanupWorker;

/// How a cleanup pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// The previous pass ran less than one cooldown ago; nothing was scanned.
    Cooldown,
    /// Durable usage was at or under the hard cap.
    UnderCap,
    /// Usage was over the cap and files were deleted.
    Evicted,
}

impl CleanupOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cooldown => "cooldown",
            Self::UnderCap => "under_cap",
            Self::Evicted => "evicted",
        }
    }
}

impl std::fmt::Display for CleanupOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub outcome: CleanupOutcome,
    /// Durable bytes measured at the start of the pass (0 on cooldown)
    pub usage_before: u64,
    /// Durable bytes after deletions
    pub usage_after: u64,
    /// Relative paths deleted, in eviction order
    pub evicted: Vec<String>,
    pub bytes_freed: u64,
    /// Files skipped because a writer held their lock
    pub skipped_busy: usize,
    /// Files whose deletion failed
    pub failed: usize,
    pub duration: Duration,
}

impl CleanupReport {
    pub(crate) fn cooldown(duration: Duration) -> Self {
        Self {
            outcome: CleanupOutcome::Cooldown,
            usage_before: 0,
            usage_after: 0,
            evicted: Vec::new(),
            bytes_freed: 0,
            skipped_busy: 0,
            failed: 0,
            duration,
        }
    }

    pub(crate) fn under_cap(usage: u64, duration: Duration) -> Self {
        Self {
            outcome: CleanupOutcome::UnderCap,
            usage_before: usage,
            usage_after: usage,
            ..Self::cooldown(duration)
        }
    }

    #[must_use]
    pub fn scanned(&self) -> bool {
        self.outcome != CleanupOutcome::Cooldown
    }
}
