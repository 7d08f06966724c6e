use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::jobs::JobKind;
use crate::registry::SharedRegistry;

/// Fetch one authoritative snapshot and merge it into the registry. Shared
/// between the poll loop and the orchestrator's forced refresh.
pub async fn reconcile<B: Backend>(
    kind: JobKind,
    backend: &B,
    registry: &SharedRegistry,
) -> Result<(), crate::error::BackendError> {
    let snapshot = backend.list_jobs(kind).await?;
    debug!(?kind, jobs = snapshot.len(), "applying snapshot");
    registry.lock().apply_snapshot(kind, snapshot);
    Ok(())
}

/// Pull-based reconciliation loop for one mounted consumer view.
///
/// One poll is in flight at a time; a timer tick that lands while a poll is
/// still outstanding is skipped rather than queued, so snapshots are never
/// applied out of order. Fetch failures are logged and otherwise ignored:
/// the registry keeps its last-known-good contents and the next tick polls
/// again. The loop ends only on `shutdown`; no poll runs afterwards.
pub struct Poller {
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<B: Backend>(
        kind: JobKind,
        backend: Arc<B>,
        registry: SharedRegistry,
        interval: Duration,
    ) -> Poller {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = signal.notified() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = reconcile(kind, backend.as_ref(), &registry).await {
                            // Transient by definition: keep last-known-good
                            // state and try again next tick.
                            warn!(?kind, "snapshot fetch failed: {}", e);
                        }
                    }
                }
            }
            debug!(?kind, "poller stopped");
        });

        Poller { shutdown, task: Some(task) }
    }

    /// Stop the loop and wait for it to finish. Any poll already in flight
    /// completes first; none starts afterwards.
    pub async fn shutdown(mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Dropping the handle without an explicit shutdown must not leave a
        // loop polling forever.
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
