use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;
use uuid::Uuid;

use mediamux_engine::backend::{Backend, Metadata, RemoteInfo};
use mediamux_engine::error::BackendError;
use mediamux_engine::jobs::{ConvertSpec, DownloadSpec, Job, JobKind, ResolvedSpec};
use mediamux_engine::AppConfig;

use crate::store::JobTable;
use crate::{ffmpeg, ytdlp, Tools};

/// The authoritative backend: assigns job ids, runs the external tools and
/// answers snapshot queries from its own job table.
pub struct HostBackend {
    tools: Tools,
    table: Arc<JobTable>,
    limiter: Arc<Semaphore>,
}

impl HostBackend {
    pub fn new(config: &AppConfig) -> HostBackend {
        HostBackend {
            tools: Tools::from_config(config),
            table: Arc::new(JobTable::new()),
            limiter: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
        }
    }

    pub fn tools(&self) -> &Tools {
        &self.tools
    }
}

impl Backend for HostBackend {
    async fn media_metadata(&self, path: &Path) -> Result<Metadata, BackendError> {
        ffmpeg::probe_media(&self.tools, path).await
    }

    async fn remote_info(&self, url: &str) -> Result<RemoteInfo, BackendError> {
        ytdlp::fetch_remote_info(&self.tools, url).await
    }

    async fn start_conversion(&self, spec: &ConvertSpec) -> Result<Job, BackendError> {
        let job = Job::queued(Uuid::new_v4().to_string(), ResolvedSpec::Convert(spec.clone()));
        let stop = self.table.insert(job.clone());
        info!(id = %job.id, input = %spec.input.display(), "conversion accepted");
        tokio::spawn(ffmpeg::run_conversion(
            self.tools.clone(),
            spec.clone(),
            job.id.clone(),
            self.table.clone(),
            self.limiter.clone(),
            stop,
        ));
        Ok(job)
    }

    async fn start_download(&self, spec: &DownloadSpec) -> Result<Job, BackendError> {
        let job = Job::queued(Uuid::new_v4().to_string(), ResolvedSpec::Download(spec.clone()));
        let stop = self.table.insert(job.clone());
        info!(id = %job.id, url = %spec.url, "download accepted");
        tokio::spawn(ytdlp::run_download(
            self.tools.clone(),
            spec.clone(),
            job.id.clone(),
            self.table.clone(),
            self.limiter.clone(),
            stop,
        ));
        Ok(job)
    }

    async fn stop_job(&self, _kind: JobKind, id: &str) -> Result<(), BackendError> {
        if self.table.signal_stop(id) {
            Ok(())
        } else {
            Err(BackendError::NotFound(format!("no job with id {}", id)))
        }
    }

    async fn stop_all(&self, kind: JobKind) -> Result<(), BackendError> {
        let signalled = self.table.signal_stop_all(kind);
        info!(?kind, signalled, "stop-all issued");
        Ok(())
    }

    async fn list_jobs(&self, kind: JobKind) -> Result<Vec<Job>, BackendError> {
        Ok(self.table.snapshot(kind))
    }

    async fn clear_history(&self, kind: JobKind) -> Result<(), BackendError> {
        let removed = self.table.clear_history(kind);
        info!(?kind, removed, "history cleared");
        Ok(())
    }
}
