// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Persisted access log for eviction ranking.
//!
//! Maps each relative path to the last time it was looked up, saved, or
//! warmed. The cleanup scheduler reads it to decide which files are idle and
//! which are least recently used.
//!
//! # Storage
//!
//! A single JSON document next to the media directories:
//!
//! ```json
//! { "version": 1, "entries": { "DiaryMedia/<id>.jpg": 1735689600000 } }
//! ```
//!
//! Loaded once at startup; persisted by snapshotting under the lock and
//! writing the snapshot outside it (temp file + rename).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::MediaError;
use crate::layout::write_file_atomic;

const FORMAT_VERSION: u32 = 1;

/// Current wall-clock time in unix millis.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedLog {
    version: u32,
    entries: HashMap<String, u64>,
}

/// Shared recency map. All mutation goes through one mutex; the lock is never
/// held across an await.
#[derive(Debug)]
pub struct AccessLog {
    path: PathBuf,
    entries: Mutex<HashMap<String, u64>>,
}

impl AccessLog {
    /// Empty log that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Load the log from `path`. A missing file gives an empty log; an
    /// unreadable or corrupt one is logged and also gives an empty log.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<PersistedLog>(&bytes) {
                Ok(log) => {
                    info!(path = %path.display(), entries = log.entries.len(), "Access log loaded");
                    log.entries
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Access log is corrupt, starting empty");
                    crate::metrics::record_error("access_log", "load", "corrupt");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No access log yet");
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read access log, starting empty");
                crate::metrics::record_error("access_log", "load", "io");
                HashMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an access now.
    pub fn touch(&self, relative: &str) {
        self.touch_at(relative, now_millis());
    }

    /// Record an access at an explicit time (unix millis).
    pub fn touch_at(&self, relative: &str, at_ms: u64) {
        self.entries.lock().insert(relative.to_string(), at_ms);
    }

    /// Forget a path; call exactly when its file is deleted.
    pub fn remove(&self, relative: &str) -> Option<u64> {
        self.entries.lock().remove(relative)
    }

    #[must_use]
    pub fn last_access(&self, relative: &str) -> Option<u64> {
        self.entries.lock().get(relative).copied()
    }

    #[must_use]
    pub fn contains(&self, relative: &str) -> bool {
        self.entries.lock().contains_key(relative)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Point-in-time copy of all entries.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Keep only the entries `keep` accepts. Returns how many were dropped.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|path, _| keep(path));
        before - entries.len()
    }

    /// Write the log to disk.
    pub async fn persist(&self) -> Result<(), MediaError> {
        let doc = PersistedLog {
            version: FORMAT_VERSION,
            entries: self.snapshot(),
        };
        let bytes = serde_json::to_vec(&doc).map_err(|e| MediaError::Write {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        write_file_atomic(&self.path, &bytes).await?;
        debug!(path = %self.path.display(), entries = doc.entries.len(), "Access log persisted");
        Ok(())
    }

    /// Persist, logging instead of returning failures.
    pub async fn persist_best_effort(&self) -> bool {
        match self.persist().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to persist access log");
                crate::metrics::record_error("access_log", "persist", e.kind());
                false
            }
        }
    }
}
