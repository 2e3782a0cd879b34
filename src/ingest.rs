// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Media ingest: durable originals and their thumbnails.
//!
//! Unlike the cache tiers, every failure here is returned to the caller. A
//! failed save never leaves a half-ingested item behind: if the thumbnail
//! cannot be produced, the freshly written original is removed again.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::config::MediaCacheConfig;
use crate::error::MediaError;
use crate::imaging;
use crate::layout::{remove_file_if_exists, write_file_atomic, StorageLayout};
use crate::media::{MediaId, MediaKind, SavedMedia};
use crate::storage::FrameExtractor;

/// Result of a successful ingest: the stored paths plus the decoded
/// thumbnail, so the caller can seed the memory tier without re-reading it.
#[derive(Debug, Clone)]
pub struct IngestedMedia {
    pub saved: SavedMedia,
    pub thumbnail: DynamicImage,
}

pub struct MediaIngest {
    layout: StorageLayout,
    frames: Arc<dyn FrameExtractor>,
    original_quality: u8,
    thumbnail_px: u32,
    thumbnail_quality: u8,
    max_video_bytes: u64,
    frame_offset: Duration,
}

impl MediaIngest {
    pub fn new(config: &MediaCacheConfig, layout: StorageLayout, frames: Arc<dyn FrameExtractor>) -> Self {
        Self {
            layout,
            frames,
            original_quality: config.original_quality,
            thumbnail_px: config.thumbnail_px,
            thumbnail_quality: config.thumbnail_quality,
            max_video_bytes: config.max_video_bytes,
            frame_offset: config.video_frame_offset(),
        }
    }

    /// Re-encode a photo as the durable original and derive its thumbnail.
    pub async fn save_image(&self, bytes: Vec<u8>, id: MediaId) -> Result<IngestedMedia, MediaError> {
        let original_path = StorageLayout::original_path(&id, MediaKind::Image);
        let original_file = self.layout.resolve(&original_path)?;
        let quality = self.original_quality;

        let (decoded, encoded) = imaging::blocking(move || {
            let decoded = imaging::decode(&bytes)?;
            let encoded = imaging::encode_jpeg(&decoded, quality)
                .map_err(|e| MediaError::InvalidPayload(format!("re-encode failed: {e}")))?;
            Ok((decoded, encoded))
        })
        .await?;

        write_file_atomic(&original_file, &encoded).await?;
        crate::metrics::record_bytes_written("origin", encoded.len());
        debug!(path = %original_path, bytes = encoded.len(), "Original image written");

        let (thumbnail_path, thumbnail) = self
            .write_thumbnail_or_rollback(&id, decoded, &original_file)
            .await?;

        Ok(IngestedMedia {
            saved: SavedMedia {
                original_path,
                thumbnail_path,
            },
            thumbnail,
        })
    }

    /// Store a video verbatim and derive its thumbnail from a frame near the
    /// configured offset.
    pub async fn save_video(&self, bytes: Vec<u8>, id: MediaId) -> Result<IngestedMedia, MediaError> {
        let size = bytes.len() as u64;
        if size > self.max_video_bytes {
            return Err(MediaError::VideoTooLarge {
                size,
                max: self.max_video_bytes,
            });
        }
        if bytes.is_empty() {
            return Err(MediaError::InvalidPayload("empty video payload".into()));
        }

        let original_path = StorageLayout::original_path(&id, MediaKind::Video);
        let original_file = self.layout.resolve(&original_path)?;

        write_file_atomic(&original_file, &bytes).await?;
        crate::metrics::record_bytes_written("origin", bytes.len());
        debug!(path = %original_path, bytes = size, "Original video written");

        let frame = match self.frames.extract_frame(&original_file, self.frame_offset).await {
            Ok(frame) => frame,
            Err(e) => {
                self.rollback(&original_file).await;
                return Err(match e {
                    MediaError::ThumbnailGeneration(_) => e,
                    other => MediaError::ThumbnailGeneration(other.to_string()),
                });
            }
        };

        let (thumbnail_path, thumbnail) = self
            .write_thumbnail_or_rollback(&id, frame, &original_file)
            .await?;

        Ok(IngestedMedia {
            saved: SavedMedia {
                original_path,
                thumbnail_path,
            },
            thumbnail,
        })
    }

    /// Downscale to the thumbnail box and encode. Shared by both media kinds.
    pub async fn make_thumbnail(&self, source: DynamicImage) -> Result<(DynamicImage, Vec<u8>), MediaError> {
        let max_side = self.thumbnail_px;
        let quality = self.thumbnail_quality;
        imaging::blocking(move || {
            let thumb = imaging::downscale(source, max_side);
            let bytes = imaging::encode_jpeg(&thumb, quality)?;
            Ok((thumb, bytes))
        })
        .await
    }

    async fn write_thumbnail_or_rollback(
        &self,
        id: &MediaId,
        source: DynamicImage,
        original_file: &Path,
    ) -> Result<(String, DynamicImage), MediaError> {
        let thumbnail_path = StorageLayout::thumbnail_path(id);
        let result = async {
            let thumbnail_file = self.layout.resolve(&thumbnail_path)?;
            let (thumb, bytes) = self.make_thumbnail(source).await?;
            write_file_atomic(&thumbnail_file, &bytes).await?;
            crate::metrics::record_bytes_written("thumbnail", bytes.len());
            Ok::<_, MediaError>(thumb)
        }
        .await;

        match result {
            Ok(thumb) => Ok((thumbnail_path, thumb)),
            Err(e) => {
                self.rollback(original_file).await;
                Err(e)
            }
        }
    }

    async fn rollback(&self, original_file: &Path) {
        if let Err(e) = remove_file_if_exists(original_file).await {
            warn!(file = %original_file.display(), error = %e, "Failed to roll back original after ingest failure");
        }
    }
}
