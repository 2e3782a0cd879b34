// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Media Cache
//!
//! Tiered image cache and bounded local storage for user media (photos and
//! videos) on a single device.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Ingest Layer                         │
//! │  • save_image(): re-encode original + 300px thumbnail       │
//! │  • save_video(): store verbatim + frame thumbnail           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Memory Tier (LRU)                        │
//! │  • Decoded renditions, bounded by count and bytes           │
//! │  • Synchronous peek for layout passes                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ miss
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Disk Tiers: ThumbCache/, DisplayCache/         │
//! │  • 168px list and 1500px display JPEGs                      │
//! │  • Reclaimable, regenerated from the origin on demand       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ miss
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Origin: DiaryMedia/, Thumbnails/               │
//! │  • Durable, held under a hard cap by the cleanup scheduler  │
//! │  • Idle files evicted first, then least recently used       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use media_cache::{MediaCache, MediaCacheConfig, MediaId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), media_cache::MediaError> {
//!     let config = MediaCacheConfig {
//!         hard_cap_bytes: 512 * 1024 * 1024,
//!         target_floor_bytes: 450 * 1024 * 1024,
//!         ..Default::default()
//!     };
//!     let cache = MediaCache::open(config, "/var/lib/diary").await?;
//!
//!     let bytes = std::fs::read("photo.jpg").unwrap_or_default();
//!     let saved = cache.save_image(bytes, MediaId::new()).await?;
//!
//!     // Memory → ThumbCache/ → origin
//!     if let Some(list) = cache.cached_list_rendition(&saved.original_path).await {
//!         println!("{}x{}", list.width(), list.height());
//!     }
//!
//!     // Remote copy not yet on this device
//!     cache
//!         .download_and_cache("https://example.com/m/1.jpg", "DiaryMedia/remote/1.jpg")
//!         .await;
//!
//!     cache.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Tiered Lookups**: memory → disk rendition → origin, promoting on every hit
//! - **Bounded Storage**: hard cap with a hysteresis floor, idle-first eviction
//! - **Access Log**: persisted recency map driving eviction order
//! - **Per-Path Locks**: eviction never deletes a file mid-write
//! - **Pluggable Collaborators**: [`MediaFetcher`] and [`FrameExtractor`] traits
//!
//! ## Configuration
//!
//! See [`MediaCacheConfig`] for all configuration options.
//!
//! ## Modules
//!
//! - [`coordinator`]: The main [`MediaCache`] tying all components together
//! - [`ingest`]: Originals and thumbnails
//! - [`tiered`]: Memory and disk rendition tiers
//! - [`storage`]: Tier implementations and collaborator traits
//! - [`access_log`]: Recency map persisted as JSON
//! - [`cleanup`]: Cleanup scheduler and its background worker
//! - [`eviction`]: Idle-first LRU ordering

pub mod config;
pub mod error;
pub mod media;
pub mod layout;
pub mod imaging;
pub mod storage;
pub mod access_log;
pub mod eviction;
pub mod locks;
pub mod tiered;
pub mod ingest;
pub mod cleanup;
pub mod coordinator;
pub mod metrics;

pub use config::{MediaCacheConfig, StorageBudget};
pub use error::{MediaError, Result};
pub use media::{MediaId, MediaKind, Rendition, RenditionKind, SavedMedia};
pub use layout::{flatten_file_name, StorageLayout};
pub use coordinator::{MediaCache, CacheState, CacheStats};
pub use access_log::AccessLog;
pub use cleanup::{CleanupOutcome, CleanupReport};
pub use eviction::{EvictionCandidate, IdleFirstPolicy};
pub use storage::traits::{FrameExtractor, MediaFetcher};
pub use storage::{FfmpegFrameExtractor, HttpFetcher};
pub use metrics::LatencyTimer;
