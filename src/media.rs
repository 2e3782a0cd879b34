// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Media identifiers and renditions.
//!
//! A [`MediaId`] is assigned at ingest and fixes the filenames of the original
//! and its thumbnail. A [`Rendition`] is a decoded, pre-scaled image held by
//! the memory tier.

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier assigned at ingest time.
///
/// # Example
///
/// ```
/// use media_cache::{MediaId, MediaKind};
///
/// let id = MediaId::new();
/// assert!(id.original_file_name(MediaKind::Image).ends_with(".jpg"));
/// assert!(id.thumbnail_file_name().ends_with("_thumb.jpg"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(Uuid);

impl MediaId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub fn original_file_name(&self, kind: MediaKind) -> String {
        format!("{}.{}", self.0, kind.extension())
    }

    #[must_use]
    pub fn thumbnail_file_name(&self) -> String {
        format!("{}_thumb.jpg", self.0)
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of captured media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Video => "mp4",
        }
    }

    /// Guess the kind from a relative path's extension.
    ///
    /// Anything that is not a known video container is treated as an image;
    /// decoding decides whether it really is one.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp4" | "mov" | "m4v" => Self::Video,
            _ => Self::Image,
        }
    }
}

/// Paths produced by a successful ingest, relative to the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMedia {
    pub original_path: String,
    pub thumbnail_path: String,
}

/// Which pre-scaled rendition a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenditionKind {
    /// Small rendition for list rows
    List,
    /// Large rendition for detail views
    Display,
}

impl RenditionKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Display => "display",
        }
    }
}

impl fmt::Display for RenditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded rendition. Cloning is cheap; the pixels are shared.
#[derive(Debug, Clone)]
pub struct Rendition {
    image: Arc<DynamicImage>,
}

impl Rendition {
    #[must_use]
    pub fn new(image: DynamicImage) -> Self {
        Self { image: Arc::new(image) }
    }

    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Decoded size in bytes, used as the memory tier cost.
    #[must_use]
    pub fn cost_bytes(&self) -> usize {
        self.image.as_bytes().len()
    }
}
