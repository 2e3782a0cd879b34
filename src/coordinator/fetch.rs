// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote fetch: pull media not present locally and warm every tier.

use tracing::{debug, warn};

use crate::imaging;
use crate::layout::write_file_atomic;
use crate::media::{Rendition, RenditionKind};
use crate::metrics::LatencyTimer;

use super::MediaCache;

impl MediaCache {
    /// Download `url`, store it as the origin at `path`, and return its
    /// display rendition. `path` must lie inside `DiaryMedia/` or
    /// `Thumbnails/`, where the bytes count toward the cap.
    ///
    /// A display rendition already in memory is returned without any network
    /// I/O. Fetch or decode failures return `None` and write nothing. There
    /// is no internal retry; dropping the future cancels the download.
    #[tracing::instrument(skip(self), fields(tier))]
    pub async fn download_and_cache(&self, url: &str, path: &str) -> Option<Rendition> {
        let file = match self.layout.resolve_durable(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "Rejected download target");
                return None;
            }
        };

        if let Some(hit) = self.tiers.peek(path, RenditionKind::Display) {
            tracing::Span::current().record("tier", "memory");
            debug!("Download skipped, display rendition in memory");
            return Some(hit);
        }
        tracing::Span::current().record("tier", "remote");

        let _timer = LatencyTimer::new("remote", "fetch");
        let bytes = match self.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Remote fetch failed");
                crate::metrics::record_operation("remote", "fetch", "error");
                crate::metrics::record_error("remote", "fetch", e.kind());
                return None;
            }
        };
        crate::metrics::record_bytes_read("remote", bytes.len());

        let (bytes, decoded) = match imaging::blocking(move || {
            let decoded = imaging::decode(&bytes)?;
            Ok((bytes, decoded))
        })
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Fetched payload is not a decodable image");
                crate::metrics::record_operation("remote", "fetch", "invalid");
                crate::metrics::record_error("remote", "decode", e.kind());
                return None;
            }
        };

        let guard = self.locks.lock(path).await;
        match write_file_atomic(&file, &bytes).await {
            Ok(()) => crate::metrics::record_bytes_written("origin", bytes.len()),
            Err(e) => {
                // Renditions below still get populated; the origin stays missing
                warn!(error = %e, "Failed to write fetched origin");
                crate::metrics::record_error("origin", "fetch_write", e.kind());
            }
        }
        let display = self.tiers.warm(path, decoded).await;
        drop(guard);

        crate::metrics::record_operation("remote", "fetch", "success");
        self.cleanup.trigger();
        display
    }
}
