use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;

use crate::error::BackendError;
use crate::jobs::{ConvertSpec, DownloadSpec, Job, JobKind};

/// Probed metadata for a local media file (Convert only).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub bitrate: Option<u64>,
    pub codec: Option<String>,
    pub size: Option<u64>,
}

/// Remote media description (Download only).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteInfo {
    pub id: String,
    pub title: String,
    pub formats: Vec<RemoteFormat>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteFormat {
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub tbr: Option<f64>,
}

/// The opaque request/response boundary to the authoritative backend.
///
/// Submission is kind-asymmetric (conversions and downloads take different
/// specs); stop/list/clear are structurally parallel and parameterized by
/// kind. `list_jobs` is the authoritative snapshot source the poller
/// reconciles against.
pub trait Backend: Send + Sync + 'static {
    fn media_metadata(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Metadata, BackendError>> + Send;

    fn remote_info(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<RemoteInfo, BackendError>> + Send;

    fn start_conversion(
        &self,
        spec: &ConvertSpec,
    ) -> impl Future<Output = Result<Job, BackendError>> + Send;

    fn start_download(
        &self,
        spec: &DownloadSpec,
    ) -> impl Future<Output = Result<Job, BackendError>> + Send;

    fn stop_job(
        &self,
        kind: JobKind,
        id: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn stop_all(&self, kind: JobKind) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn list_jobs(
        &self,
        kind: JobKind,
    ) -> impl Future<Output = Result<Vec<Job>, BackendError>> + Send;

    fn clear_history(&self, kind: JobKind)
        -> impl Future<Output = Result<(), BackendError>> + Send;
}
