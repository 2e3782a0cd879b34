// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Eviction ordering for durable storage.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Eviction Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  idle_lru.rs    - Idle-first LRU ordering                    │
//! │  └─ EvictionCandidate: path + size + last access             │
//! │  └─ IdleFirstPolicy: idle queue, then active queue           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The memory tier does its own plain LRU eviction (see
//! [`crate::storage::memory`]). This module only ranks durable files for
//! the cleanup scheduler in [`crate::cleanup`].

pub mod idle_lru;

pub use idle_lru::{EvictionCandidate, IdleFirstPolicy};
