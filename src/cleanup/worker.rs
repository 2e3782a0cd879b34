// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Background task that runs cleanup passes one at a time.
//!
//! Requests arrive on a bounded channel. A fire-and-forget trigger that
//! finds the channel full is dropped: a pass is already queued and will see
//! the same state. Awaitable requests carry a oneshot for the report.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CleanupReport, CleanupScheduler};

const QUEUE_DEPTH: usize = 4;

struct CleanupRequest {
    reply: Option<oneshot::Sender<CleanupReport>>,
}

pub struct CleanupWorker {
    tx: Mutex<Option<mpsc::Sender<CleanupRequest>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CleanupWorker {
    /// Spawn the worker onto the current runtime.
    pub fn spawn(scheduler: Arc<CleanupScheduler>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let handle = tokio::spawn(Self::run(scheduler, rx));
        Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    async fn run(scheduler: Arc<CleanupScheduler>, mut rx: mpsc::Receiver<CleanupRequest>) {
        debug!("Cleanup worker started");
        while let Some(request) = rx.recv().await {
            let report = scheduler.run_pass().await;
            if let Some(reply) = request.reply {
                // Caller may have stopped waiting
                let _ = reply.send(report);
            }
        }
        debug!("Cleanup worker stopped");
    }

    fn sender(&self) -> Option<mpsc::Sender<CleanupRequest>> {
        self.tx.lock().clone()
    }

    /// Queue a pass without waiting for it.
    pub fn trigger(&self) {
        let Some(tx) = self.sender() else {
            return;
        };
        match tx.try_send(CleanupRequest { reply: None }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Cleanup already queued, trigger coalesced");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Cleanup worker is gone, trigger dropped");
            }
        }
    }

    /// Queue a pass and wait for its report. `None` once the worker has shut down.
    pub async fn run_now(&self) -> Option<CleanupReport> {
        let tx = self.sender()?;
        let (reply, rx) = oneshot::channel();
        tx.send(CleanupRequest { reply: Some(reply) }).await.ok()?;
        rx.await.ok()
    }

    /// Stop accepting requests, let queued passes finish, and wait for the task.
    pub async fn shutdown(&self) {
        drop(self.tx.lock().take());
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cleanup worker ended abnormally");
            } else {
                info!("Cleanup worker shut down");
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tx.lock().is_some()
    }
}

impl Drop for CleanupWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
