use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::backend::{Backend, Metadata, RemoteInfo};
use crate::dialog::{ConfirmGate, DestructiveAction};
use crate::error::{BackendError, RemoteInfoError};
use crate::jobs::{ConvertSpec, DownloadSpec, Job, JobKind};
use crate::poller::reconcile;
use crate::registry::SharedRegistry;

/// Submit/stop/stop-all/clear-history operations with optimistic local
/// mutation and backend confirmation. Only this and the poller mutate the
/// registry; display consumers are read-only observers.
pub struct Orchestrator<B: Backend> {
    backend: Arc<B>,
    registry: SharedRegistry,
}

impl<B: Backend> Orchestrator<B> {
    pub fn new(backend: Arc<B>, registry: SharedRegistry) -> Orchestrator<B> {
        Orchestrator { backend, registry }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Submit a resolved conversion. On success the returned job is placed
    /// in the registry as an optimistic placeholder until the next
    /// snapshot; on failure nothing is added and nothing is retried.
    pub async fn submit_conversion(&self, spec: ConvertSpec) -> Result<Job, BackendError> {
        match self.backend.start_conversion(&spec).await {
            Ok(job) => {
                info!(id = %job.id, input = %job.source, "conversion submitted");
                self.registry.lock().upsert(job.clone());
                Ok(job)
            }
            Err(e) => {
                error!("failed to start conversion: {}", e);
                Err(e)
            }
        }
    }

    pub async fn submit_download(&self, spec: DownloadSpec) -> Result<Job, BackendError> {
        match self.backend.start_download(&spec).await {
            Ok(job) => {
                info!(id = %job.id, url = %job.source, "download submitted");
                self.registry.lock().upsert(job.clone());
                Ok(job)
            }
            Err(e) => {
                error!("failed to start download: {}", e);
                Err(e)
            }
        }
    }

    /// Stop one job. The job leaves the Active partition immediately, before
    /// the backend round-trip; a failed stop request does not roll that
    /// back — the next snapshot restores the job if it is in fact still
    /// active.
    pub async fn stop(&self, kind: JobKind, id: &str) -> Result<(), BackendError> {
        self.registry.lock().remove(id);
        match self.backend.stop_job(kind, id).await {
            Ok(()) => {
                info!(%id, "stop requested");
                if let Err(e) = reconcile(kind, self.backend.as_ref(), &self.registry).await {
                    warn!(?kind, "refresh after stop failed: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                warn!(%id, "stop request failed, job resurfaces on next poll: {}", e);
                Err(e)
            }
        }
    }

    /// Stop every active job of a kind. Requires confirmation first; a
    /// declined gate means no backend call and no local mutation. Returns
    /// whether the action was carried out.
    pub async fn stop_all(
        &self,
        kind: JobKind,
        gate: &impl ConfirmGate,
    ) -> Result<bool, BackendError> {
        if !gate.confirm(DestructiveAction::StopAll) {
            return Ok(false);
        }

        let cleared = self
            .registry
            .lock()
            .remove_all(|j| j.kind == kind && j.status.is_active());
        info!(?kind, cleared, "stopping all active jobs");

        self.backend.stop_all(kind).await?;

        // Reconcile right away instead of waiting out the tick.
        if let Err(e) = reconcile(kind, self.backend.as_ref(), &self.registry).await {
            warn!(?kind, "refresh after stop-all failed: {}", e);
        }
        Ok(true)
    }

    /// Clear terminal jobs. When anything is still active the gate must
    /// confirm first (history is wiped, active jobs are unaffected).
    /// Returns whether the action was carried out.
    pub async fn clear_history(
        &self,
        kind: JobKind,
        gate: &impl ConfirmGate,
    ) -> Result<bool, BackendError> {
        let has_active = self
            .registry
            .lock()
            .jobs_of(kind)
            .iter()
            .any(|j| j.status.is_active());
        if has_active && !gate.confirm(DestructiveAction::ClearHistoryWhileActive) {
            return Ok(false);
        }

        let cleared = self
            .registry
            .lock()
            .remove_all(|j| j.kind == kind && j.status.is_terminal());
        info!(?kind, cleared, "clearing history");

        self.backend.clear_history(kind).await?;
        Ok(true)
    }

    /// Probe a local file for the conversion form's info box.
    pub async fn media_metadata(&self, path: &Path) -> Result<Metadata, BackendError> {
        self.backend.media_metadata(path).await
    }

    /// Fetch remote media metadata for the download form. An answer with no
    /// formats is an error: there is nothing submittable.
    pub async fn remote_info(&self, url: &str) -> Result<RemoteInfo, RemoteInfoError> {
        let info = self
            .backend
            .remote_info(url)
            .await
            .map_err(|e| RemoteInfoError::Fetch(e.to_string()))?;
        if info.formats.is_empty() {
            return Err(RemoteInfoError::NoFormats);
        }
        Ok(info)
    }

    /// Force an immediate snapshot merge.
    pub async fn refresh(&self, kind: JobKind) -> Result<(), BackendError> {
        reconcile(kind, self.backend.as_ref(), &self.registry).await
    }
}
