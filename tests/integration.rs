// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Integration Tests for Media Cache
//!
//! End-to-end tests through the public [`MediaCache`] API against a real
//! temporary directory, with stub fetcher and frame-extractor collaborators.
//!
//! # Running Tests
//! ```bash
//! cargo test --test integration
//!
//! # Only cleanup scenarios
//! cargo test --test integration cleanup
//! ```
//!
//! # Test Organization
//! - `happy_*` - Normal operation: save, look up, delete, fetch
//! - `cleanup_*` - Cap enforcement, idle-first ordering, cooldown
//! - `lifecycle_*` - Reopen, flush, shutdown

mod common;

use std::time::Duration;

use image::GenericImageView;

use common::*;
use media_cache::{
    flatten_file_name, CacheState, CleanupOutcome, MediaCache, MediaCacheConfig, MediaError, MediaId,
};

fn list_file(cache: &MediaCache, path: &str) -> std::path::PathBuf {
    cache.layout().list_cache_dir().join(flatten_file_name(path))
}

fn display_file(cache: &MediaCache, path: &str) -> std::path::PathBuf {
    cache.layout().display_cache_dir().join(flatten_file_name(path))
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn happy_image_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;

    let saved = cache.save_image(jpeg_bytes(640, 480), MediaId::new()).await.unwrap();

    let bytes = cache.load_original(&saved.original_path).await.unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.dimensions(), (640, 480));
    assert!(dir.path().join(&saved.thumbnail_path).exists());
}

#[tokio::test]
async fn happy_video_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let frames = StubFrames::solid(1280, 720);
    let cache = open_cache_with(dir.path(), test_config(), CountingFetcher::failing("offline"), frames.clone()).await;
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    let saved = cache.save_video(payload.clone(), MediaId::new()).await.unwrap();

    assert!(saved.original_path.ends_with(".mp4"));
    assert_eq!(cache.load_original(&saved.original_path).await.unwrap(), payload);
    assert_eq!(frames.calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    let thumb = image::load_from_memory(&cache.load_original(&saved.thumbnail_path).await.unwrap()).unwrap();
    assert_eq!(thumb.dimensions(), (300, 169));
}

#[tokio::test]
async fn happy_save_touches_log_and_seeds_thumbnail() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;

    let saved = cache.save_image(jpeg_bytes(800, 600), MediaId::new()).await.unwrap();

    assert!(cache.access_log().contains(&saved.original_path));
    assert!(cache.access_log().contains(&saved.thumbnail_path));
    let seeded = cache.peek_list_rendition(&saved.thumbnail_path).unwrap();
    assert_eq!(seeded.width(), 168);
    assert!(list_file(&cache, &saved.thumbnail_path).exists());
}

#[tokio::test]
async fn happy_cache_population_survives_origin_loss() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    let saved = cache.save_image(jpeg_bytes(1024, 768), MediaId::new()).await.unwrap();
    let path = saved.original_path.as_str();

    assert!(cache.peek_list_rendition(path).is_none());
    let first = cache.cached_list_rendition(path).await.unwrap();
    assert_eq!((first.width(), first.height()), (168, 126));
    assert!(cache.peek_list_rendition(path).is_some());
    assert!(list_file(&cache, path).exists());

    tokio::fs::remove_file(dir.path().join(path)).await.unwrap();
    assert!(cache.cached_list_rendition(path).await.is_some());

    // Memory gone too: the disk tier still answers
    cache.handle_memory_pressure();
    assert!(cache.peek_list_rendition(path).is_none());
    let from_disk = cache.cached_list_rendition(path).await.unwrap();
    assert_eq!(from_disk.width(), 168);
}

#[tokio::test]
async fn happy_display_rendition_is_larger() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    let saved = cache.save_image(jpeg_bytes(2000, 1000), MediaId::new()).await.unwrap();

    let display = cache.cached_display_rendition(&saved.original_path).await.unwrap();
    assert_eq!((display.width(), display.height()), (1500, 750));
    assert!(display_file(&cache, &saved.original_path).exists());
    assert!(cache.peek_display_rendition(&saved.original_path).is_some());
}

#[tokio::test]
async fn happy_delete_is_complete() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    let saved = cache.save_image(jpeg_bytes(400, 400), MediaId::new()).await.unwrap();
    let path = saved.original_path.as_str();
    cache.cached_list_rendition(path).await.unwrap();
    cache.cached_display_rendition(path).await.unwrap();

    cache.delete_media(path).await.unwrap();

    assert!(cache.cached_list_rendition(path).await.is_none());
    assert!(cache.cached_display_rendition(path).await.is_none());
    assert!(!cache.access_log().contains(path));
    assert!(!list_file(&cache, path).exists());
    assert!(!display_file(&cache, path).exists());

    let report = cache.run_cleanup().await.unwrap();
    assert!(report.evicted.iter().all(|p| p != path));
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn happy_delete_missing_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    cache.delete_media("DiaryMedia/never-existed.jpg").await.unwrap();
    assert!(matches!(
        cache.delete_media("../outside.jpg").await,
        Err(MediaError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn happy_delete_saved_removes_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    let saved = cache.save_image(jpeg_bytes(200, 100), MediaId::new()).await.unwrap();

    cache.delete_saved(&saved).await.unwrap();

    assert!(!dir.path().join(&saved.original_path).exists());
    assert!(!dir.path().join(&saved.thumbnail_path).exists());
    assert!(cache.peek_list_rendition(&saved.thumbnail_path).is_none());
    assert_eq!(cache.total_durable_storage_bytes().await, 0);
}

#[tokio::test]
async fn happy_refetch_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = CountingFetcher::ok(jpeg_bytes(2400, 1200));
    let cache = open_cache_with(dir.path(), test_config(), fetcher.clone(), StubFrames::failing()).await;
    let path = "DiaryMedia/remote/trip 2024.jpg";

    let first = cache.download_and_cache("https://cdn.test/a.jpg", path).await.unwrap();
    let second = cache.download_and_cache("https://cdn.test/a.jpg", path).await.unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert_eq!((first.width(), first.height()), (1500, 750));
    assert_eq!(second.width(), first.width());
    assert!(dir.path().join(path).exists());
    assert!(list_file(&cache, path).exists());
    assert!(display_file(&cache, path).exists());
    assert!(cache.peek_list_rendition(path).is_some());
    assert!(cache.access_log().contains(path));
}

#[tokio::test]
async fn happy_rendition_bytes_not_counted_as_durable() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    let saved = cache.save_image(jpeg_bytes(900, 900), MediaId::new()).await.unwrap();
    let durable = cache.total_durable_storage_bytes().await;

    cache.cached_display_rendition(&saved.original_path).await.unwrap();

    assert_eq!(cache.total_durable_storage_bytes().await, durable);
    assert!(cache.total_rendition_cache_bytes().await > 0);
}

// =============================================================================
// Cleanup
// =============================================================================

#[tokio::test]
async fn cleanup_enforces_cap_down_to_floor() {
    let dir = tempfile::tempdir().unwrap();
    let config = MediaCacheConfig {
        hard_cap_bytes: 10_000,
        target_floor_bytes: 6_000,
        ..test_config()
    };
    let cache = open_cache(dir.path(), config).await;
    let now = now_ms();
    for i in 0..8u64 {
        let path = format!("DiaryMedia/{i}.jpg");
        write_raw(dir.path(), &path, 2_000).await;
        cache.access_log().touch_at(&path, now - (8 - i) * HOUR_MS);
    }
    assert_eq!(cache.total_durable_storage_bytes().await, 16_000);

    let report = cache.run_cleanup().await.unwrap();

    assert_eq!(report.outcome, CleanupOutcome::Evicted);
    assert_eq!(report.usage_after, 6_000);
    assert_eq!(report.evicted.len(), 5);
    assert_eq!(report.evicted[0], "DiaryMedia/0.jpg");
    assert_eq!(cache.total_durable_storage_bytes().await, 6_000);
    for evicted in &report.evicted {
        assert!(!cache.access_log().contains(evicted));
    }
}

#[tokio::test]
async fn cleanup_idle_first_only_evicts_idle_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = MediaCacheConfig {
        hard_cap_bytes: 1000,
        target_floor_bytes: 900,
        ..test_config()
    };
    let cache = open_cache(dir.path(), config).await;
    let now = now_ms();
    for (path, size, age) in [
        ("DiaryMedia/A.jpg", 400, 10 * DAY_MS),
        ("DiaryMedia/B.jpg", 400, DAY_MS),
        ("DiaryMedia/C.jpg", 300, HOUR_MS),
    ] {
        write_raw(dir.path(), path, size).await;
        cache.access_log().touch_at(path, now - age);
    }

    let report = cache.run_cleanup().await.unwrap();

    assert_eq!(report.evicted, vec!["DiaryMedia/A.jpg".to_string()]);
    assert_eq!(report.usage_after, 700);
    assert!(dir.path().join("DiaryMedia/B.jpg").exists());
    assert!(dir.path().join("DiaryMedia/C.jpg").exists());
}

#[tokio::test]
async fn cleanup_purges_renditions_of_evicted_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = MediaCacheConfig {
        hard_cap_bytes: 1,
        target_floor_bytes: 0,
        ..test_config()
    };
    let fetcher = CountingFetcher::ok(jpeg_bytes(300, 300));
    let cache = open_cache_with(dir.path(), config, fetcher, StubFrames::failing()).await;
    let path = "DiaryMedia/remote.jpg";
    cache.download_and_cache("https://cdn.test/r.jpg", path).await.unwrap();

    cache.run_cleanup().await.unwrap();

    assert!(!dir.path().join(path).exists());
    assert!(cache.peek_display_rendition(path).is_none());
    assert!(!display_file(&cache, path).exists());
    assert_eq!(cache.total_durable_storage_bytes().await, 0);
}

#[tokio::test]
async fn cleanup_cooldown_allows_one_scan() {
    let dir = tempfile::tempdir().unwrap();
    let config = MediaCacheConfig {
        cleanup_cooldown_secs: 3600,
        ..Default::default()
    };
    let cache = MediaCache::open_with(config, dir.path(), CountingFetcher::failing("x"), StubFrames::failing())
        .await
        .unwrap();

    // Startup pass is queued first and scans; both later passes are gated
    let first = cache.run_cleanup().await.unwrap();
    let second = cache.run_cleanup().await.unwrap();
    assert_eq!(first.outcome, CleanupOutcome::Cooldown);
    assert_eq!(second.outcome, CleanupOutcome::Cooldown);
    assert!(cache.stats().last_cleanup_ms.is_some());
}

#[tokio::test]
async fn cleanup_schedule_is_non_blocking() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    for _ in 0..50 {
        cache.schedule_cleanup();
    }
    let report = tokio::time::timeout(Duration::from_secs(10), cache.run_cleanup())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.outcome, CleanupOutcome::UnderCap);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn lifecycle_access_log_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let saved = {
        let cache = open_cache(dir.path(), test_config()).await;
        let saved = cache.save_image(jpeg_bytes(120, 80), MediaId::new()).await.unwrap();
        assert!(cache.flush_access_log().await);
        cache.shutdown().await;
        saved
    };

    let reopened = open_cache(dir.path(), test_config()).await;
    assert!(reopened.access_log().contains(&saved.original_path));
    assert!(reopened.access_log().contains(&saved.thumbnail_path));
}

#[tokio::test]
async fn lifecycle_shutdown_stops_worker() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    let saved = cache.save_image(jpeg_bytes(64, 64), MediaId::new()).await.unwrap();
    assert_eq!(cache.state(), CacheState::Ready);

    cache.shutdown().await;

    assert_eq!(cache.state(), CacheState::Stopped);
    assert!(cache.run_cleanup().await.is_none());
    assert!(dir.path().join("media_access_log.json").exists());
    assert!(cache.peek_list_rendition(&saved.thumbnail_path).is_none());
    // Lookups keep working from disk
    assert!(cache.cached_list_rendition(&saved.original_path).await.is_some());
    cache.shutdown().await;
}

#[tokio::test]
async fn lifecycle_stats_reflect_memory_tier() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    let before = cache.stats();
    assert_eq!(before.memory_entries, 0);

    let saved = cache.save_image(jpeg_bytes(500, 500), MediaId::new()).await.unwrap();
    cache.cached_display_rendition(&saved.original_path).await.unwrap();

    let after = cache.stats();
    assert_eq!(after.memory_entries, 2);
    assert!(after.memory_bytes > 0);
    assert_eq!(after.access_log_entries, 2);

    cache.handle_memory_pressure();
    assert_eq!(cache.stats().memory_entries, 0);
}

#[tokio::test]
async fn lifecycle_clear_all_resets_everything() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_cache(dir.path(), test_config()).await;
    let saved = cache.save_image(jpeg_bytes(300, 200), MediaId::new()).await.unwrap();
    cache.cached_display_rendition(&saved.original_path).await.unwrap();

    cache.clear_all().await.unwrap();

    assert_eq!(cache.total_durable_storage_bytes().await, 0);
    assert_eq!(cache.total_rendition_cache_bytes().await, 0);
    assert!(cache.access_log().is_empty());
    assert_eq!(cache.stats().memory_entries, 0);
    assert!(cache.layout().originals_dir().is_dir());
    assert!(cache.load_original(&saved.original_path).await.is_none());
}
