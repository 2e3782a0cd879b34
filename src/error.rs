// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the media cache.
///
/// Only ingest, explicit deletion and configuration report these to callers.
/// Cache lookups, cleanup and access-log persistence log them and carry on.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid media payload: {0}")]
    InvalidPayload(String),
    #[error("Thumbnail generation failed: {0}")]
    ThumbnailGeneration(String),
    #[error("Video is {size} bytes, exceeding the {max} byte limit")]
    VideoTooLarge { size: u64, max: u64 },
    #[error("Invalid relative path '{0}'")]
    InvalidPath(String),
    #[error("Remote fetch failed: {0}")]
    Fetch(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MediaError {
    /// Short label used for error metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DirectoryCreation { .. } => "directory_creation",
            Self::Write { .. } => "write",
            Self::Io { .. } => "io",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::ThumbnailGeneration(_) => "thumbnail",
            Self::VideoTooLarge { .. } => "video_too_large",
            Self::InvalidPath(_) => "invalid_path",
            Self::Fetch(_) => "fetch",
            Self::InvalidConfig(_) => "config",
        }
    }
}

pub type Result<T, E = MediaError> = std::result::Result<T, E>;
