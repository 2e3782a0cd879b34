// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage tiers and external collaborators.
//!
//! - [`memory`]: bounded LRU of decoded renditions
//! - [`disk`]: flat on-disk rendition directories
//! - [`traits`]: seams for network fetch and video frame extraction
//! - [`http`] / [`ffmpeg`]: default implementations of those seams

pub mod traits;
pub mod memory;
pub mod disk;
pub mod http;
pub mod ffmpeg;

pub use traits::{FrameExtractor, MediaFetcher};
pub use memory::{MemoryKey, MemoryTier};
pub use disk::DiskTier;
pub use http::HttpFetcher;
pub use ffmpeg::FfmpegFrameExtractor;
