// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::MediaError;
use crate::layout::{flatten_file_name, remove_file_if_exists, write_file_atomic};
use crate::media::RenditionKind;

/// One reclaimable on-disk rendition directory.
///
/// Files are flat: the relative path of the origin is flattened into a
/// single file name, so the directory never grows subdirectories.
#[derive(Debug, Clone)]
pub struct DiskTier {
    kind: RenditionKind,
    dir: PathBuf,
    max_side: u32,
    quality: u8,
}

impl DiskTier {
    pub fn new(kind: RenditionKind, dir: impl Into<PathBuf>, max_side: u32, quality: u8) -> Self {
        Self {
            kind,
            dir: dir.into(),
            max_side,
            quality,
        }
    }

    #[must_use]
    pub fn kind(&self) -> RenditionKind {
        self.kind
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Longest side renditions in this tier are scaled to.
    #[must_use]
    pub fn max_side(&self) -> u32 {
        self.max_side
    }

    #[must_use]
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Metrics label for this tier.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.kind {
            RenditionKind::List => "list_disk",
            RenditionKind::Display => "display_disk",
        }
    }

    #[must_use]
    pub fn file_for(&self, relative: &str) -> PathBuf {
        self.dir.join(flatten_file_name(relative))
    }

    /// Read the encoded rendition. Misses and read failures are both `None`.
    pub async fn read(&self, relative: &str) -> Option<Vec<u8>> {
        let file = self.file_for(relative);
        match tokio::fs::read(&file).await {
            Ok(bytes) => {
                crate::metrics::record_bytes_read(self.label(), bytes.len());
                Some(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Rendition read failed");
                crate::metrics::record_error(self.label(), "get", "io");
                None
            }
        }
    }

    pub async fn write(&self, relative: &str, bytes: &[u8]) -> Result<(), MediaError> {
        write_file_atomic(&self.file_for(relative), bytes).await?;
        crate::metrics::record_bytes_written(self.label(), bytes.len());
        Ok(())
    }

    /// Remove the rendition for `relative`. Returns whether a file existed.
    pub async fn remove(&self, relative: &str) -> Result<bool, MediaError> {
        remove_file_if_exists(&self.file_for(relative)).await
    }

    pub async fn contains(&self, relative: &str) -> bool {
        tokio::fs::try_exists(self.file_for(relative)).await.unwrap_or(false)
    }

    /// Delete the whole directory.
    pub async fn clear(&self) -> Result<(), MediaError> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MediaError::Io {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}
