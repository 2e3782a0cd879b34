// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for media-cache.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `media_cache_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for sizes
//!
//! # Labels
//! - `tier`: memory, list_disk, display_disk, origin, remote
//! - `operation`: get, put, evict, save_image, save_video, fetch
//! - `status`: hit, miss, success, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a tier operation outcome
pub fn record_operation(tier: &str, operation: &str, status: &str) {
    counter!(
        "media_cache_operations_total",
        "tier" => tier.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(tier: &str, operation: &str, duration: Duration) {
    histogram!(
        "media_cache_operation_seconds",
        "tier" => tier.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Set current memory tier size in decoded bytes
pub fn set_memory_tier_bytes(bytes: usize) {
    gauge!("media_cache_memory_tier_bytes").set(bytes as f64);
}

/// Set current memory tier entry count
pub fn set_memory_tier_items(count: usize) {
    gauge!("media_cache_memory_tier_items").set(count as f64);
}

/// Set measured durable storage usage
pub fn set_durable_storage_bytes(bytes: u64) {
    gauge!("media_cache_durable_storage_bytes").set(bytes as f64);
}

/// Record memory tier LRU evictions
pub fn record_memory_eviction(count: usize) {
    counter!("media_cache_memory_evictions_total").increment(count as u64);
}

/// Record files removed by the cleanup scheduler
pub fn record_eviction(count: usize, bytes: u64) {
    counter!("media_cache_evictions_total").increment(count as u64);
    counter!("media_cache_evicted_bytes_total").increment(bytes);
}

/// Record a cleanup pass and how it ended (cooldown, under_cap, evicted, busy)
pub fn record_cleanup_pass(outcome: &str, duration: Duration) {
    counter!(
        "media_cache_cleanup_passes_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("media_cache_cleanup_seconds").record(duration.as_secs_f64());
}

/// Record an error with category for alerting
pub fn record_error(tier: &str, operation: &str, error_type: &str) {
    counter!(
        "media_cache_errors_total",
        "tier" => tier.to_string(),
        "operation" => operation.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Record bytes written to a tier
pub fn record_bytes_written(tier: &str, bytes: usize) {
    counter!(
        "media_cache_bytes_written_total",
        "tier" => tier.to_string()
    )
    .increment(bytes as u64);
}

/// Record bytes read from a tier
pub fn record_bytes_read(tier: &str, bytes: usize) {
    counter!(
        "media_cache_bytes_read_total",
        "tier" => tier.to_string()
    )
    .increment(bytes as u64);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    tier: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(tier: &'static str, operation: &'static str) -> Self {
        Self {
            tier,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.tier, self.operation, self.start.elapsed());
    }
}
