// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the media cache.
//!
//! # Example
//!
//! ```
//! use media_cache::MediaCacheConfig;
//!
//! // Minimal config (uses defaults)
//! let config = MediaCacheConfig::default();
//! assert_eq!(config.hard_cap_bytes, 1024 * 1024 * 1024); // 1 GiB
//!
//! // Tighter budget for a small device
//! let config = MediaCacheConfig {
//!     hard_cap_bytes: 256 * 1024 * 1024,
//!     target_floor_bytes: 230 * 1024 * 1024,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::MediaError;

/// Configuration for the media cache.
///
/// All fields have sensible defaults tuned for a phone-sized journal. The
/// storage budget fields are the ones most deployments override.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaCacheConfig {
    /// Hard cap on durable storage (originals + thumbnails), in bytes (default: 1 GiB)
    #[serde(default = "default_hard_cap_bytes")]
    pub hard_cap_bytes: u64,

    /// Cleanup stops once durable usage is at or below this floor (default: 900 MiB)
    #[serde(default = "default_target_floor_bytes")]
    pub target_floor_bytes: u64,

    /// Files not accessed for this long are evicted before any active file (default: 7 days)
    #[serde(default = "default_idle_threshold_secs")]
    pub idle_threshold_secs: u64,

    /// Minimum time between two cleanup scans (default: 6 hours)
    #[serde(default = "default_cleanup_cooldown_secs")]
    pub cleanup_cooldown_secs: u64,

    /// Longest side of list-row renditions, in pixels
    #[serde(default = "default_list_rendition_px")]
    pub list_rendition_px: u32,

    /// Longest side of detail-view renditions, in pixels
    #[serde(default = "default_display_rendition_px")]
    pub display_rendition_px: u32,

    /// Longest side of the durable ingest thumbnail, in pixels
    #[serde(default = "default_thumbnail_px")]
    pub thumbnail_px: u32,

    /// JPEG quality (1-100) per tier
    #[serde(default = "default_original_quality")]
    pub original_quality: u8,
    #[serde(default = "default_thumbnail_quality")]
    pub thumbnail_quality: u8,
    #[serde(default = "default_list_quality")]
    pub list_quality: u8,
    #[serde(default = "default_display_quality")]
    pub display_quality: u8,

    /// Largest accepted video payload (default: 100 MiB)
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,

    /// Where in the clip the thumbnail frame is taken from
    #[serde(default = "default_video_frame_offset_ms")]
    pub video_frame_offset_ms: u64,

    /// Memory tier bounds
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,
    #[serde(default = "default_memory_max_bytes")]
    pub memory_max_bytes: usize,
}

fn default_hard_cap_bytes() -> u64 { 1024 * 1024 * 1024 } // 1 GiB
fn default_target_floor_bytes() -> u64 { 900 * 1024 * 1024 } // 900 MiB
fn default_idle_threshold_secs() -> u64 { 7 * 24 * 60 * 60 }
fn default_cleanup_cooldown_secs() -> u64 { 6 * 60 * 60 }
fn default_list_rendition_px() -> u32 { 168 }
fn default_display_rendition_px() -> u32 { 1500 }
fn default_thumbnail_px() -> u32 { 300 }
fn default_original_quality() -> u8 { 80 }
fn default_thumbnail_quality() -> u8 { 70 }
fn default_list_quality() -> u8 { 70 }
fn default_display_quality() -> u8 { 80 }
fn default_max_video_bytes() -> u64 { 100 * 1024 * 1024 } // 100 MiB
fn default_video_frame_offset_ms() -> u64 { 1000 }
fn default_memory_max_entries() -> usize { 200 }
fn default_memory_max_bytes() -> usize { 100 * 1024 * 1024 } // 100 MiB decoded

impl Default for MediaCacheConfig {
    fn default() -> Self {
        Self {
            hard_cap_bytes: default_hard_cap_bytes(),
            target_floor_bytes: default_target_floor_bytes(),
            idle_threshold_secs: default_idle_threshold_secs(),
            cleanup_cooldown_secs: default_cleanup_cooldown_secs(),
            list_rendition_px: default_list_rendition_px(),
            display_rendition_px: default_display_rendition_px(),
            thumbnail_px: default_thumbnail_px(),
            original_quality: default_original_quality(),
            thumbnail_quality: default_thumbnail_quality(),
            list_quality: default_list_quality(),
            display_quality: default_display_quality(),
            max_video_bytes: default_max_video_bytes(),
            video_frame_offset_ms: default_video_frame_offset_ms(),
            memory_max_entries: default_memory_max_entries(),
            memory_max_bytes: default_memory_max_bytes(),
        }
    }
}

impl MediaCacheConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, MediaError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MediaError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the cache cannot honour.
    pub fn validate(&self) -> Result<(), MediaError> {
        if self.target_floor_bytes > self.hard_cap_bytes {
            return Err(MediaError::InvalidConfig(format!(
                "target floor {} exceeds hard cap {}",
                self.target_floor_bytes, self.hard_cap_bytes
            )));
        }
        for (name, px) in [
            ("list_rendition_px", self.list_rendition_px),
            ("display_rendition_px", self.display_rendition_px),
            ("thumbnail_px", self.thumbnail_px),
        ] {
            if px == 0 {
                return Err(MediaError::InvalidConfig(format!("{name} must be non-zero")));
            }
        }
        for (name, quality) in [
            ("original_quality", self.original_quality),
            ("thumbnail_quality", self.thumbnail_quality),
            ("list_quality", self.list_quality),
            ("display_quality", self.display_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(MediaError::InvalidConfig(format!(
                    "{name} must be within 1..=100, got {quality}"
                )));
            }
        }
        Ok(())
    }

    /// The eviction budget derived from this config.
    #[must_use]
    pub fn budget(&self) -> StorageBudget {
        StorageBudget {
            hard_cap_bytes: self.hard_cap_bytes,
            target_floor_bytes: self.target_floor_bytes,
            idle_threshold: Duration::from_secs(self.idle_threshold_secs),
            cooldown: Duration::from_secs(self.cleanup_cooldown_secs),
        }
    }

    #[must_use]
    pub fn video_frame_offset(&self) -> Duration {
        Duration::from_millis(self.video_frame_offset_ms)
    }
}

/// Storage ceiling and eviction timing used by the cleanup scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageBudget {
    pub hard_cap_bytes: u64,
    pub target_floor_bytes: u64,
    pub idle_threshold: Duration,
    pub cooldown: Duration,
}
