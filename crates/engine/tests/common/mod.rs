#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mediamux_engine::backend::{Backend, Metadata, RemoteFormat, RemoteInfo};
use mediamux_engine::catalog::Quality;
use mediamux_engine::error::BackendError;
use mediamux_engine::jobs::{
    AudioParams, ConvertSpec, DownloadSpec, Job, JobKind, JobStatus, ResolvedSpec, VideoParams,
};

pub fn convert_spec(input: &str) -> ConvertSpec {
    ConvertSpec {
        input: PathBuf::from(input),
        output_dir: PathBuf::from("/out"),
        container: "mp4".to_string(),
        quality: Quality::Medium,
        video: Some(VideoParams {
            codec: "h264".to_string(),
            engine: "libx264".to_string(),
            bitrate: "2500k".to_string(),
            resolution: "1280x720".to_string(),
            framerate: None,
        }),
        audio: AudioParams {
            codec: "aac".to_string(),
            engine: "aac".to_string(),
            bitrate: "192k".to_string(),
            sample_rate: "44100".to_string(),
            channels: "2".to_string(),
        },
    }
}

pub fn download_spec(url: &str) -> DownloadSpec {
    DownloadSpec {
        url: url.to_string(),
        output_dir: PathBuf::from("/out"),
        format_id: "137".to_string(),
        container: "mp4".to_string(),
        audio_quality: "192".to_string(),
        video_quality: "1080".to_string(),
    }
}

pub fn job(id: &str, kind: JobKind, status: JobStatus, progress: u8) -> Job {
    let resolved = match kind {
        JobKind::Convert => ResolvedSpec::Convert(convert_spec("/media/in.mkv")),
        JobKind::Download => ResolvedSpec::Download(download_spec("https://example.com/v/1")),
    };
    let mut job = Job::queued(id.to_string(), resolved);
    job.status = status;
    job.progress = progress;
    job
}

pub fn remote_info(format_ids: &[&str]) -> RemoteInfo {
    RemoteInfo {
        id: "vid-1".to_string(),
        title: "A test video".to_string(),
        formats: format_ids
            .iter()
            .map(|id| RemoteFormat {
                format_id: id.to_string(),
                ext: Some("mp4".to_string()),
                format_note: None,
                resolution: None,
                filesize: Some(1_000_000),
                vcodec: None,
                acodec: None,
                tbr: None,
            })
            .collect(),
        thumbnail: None,
        duration: Some(60.0),
        uploader: None,
    }
}

/// Backend double whose snapshot answers are scripted ahead of time. Once
/// the script runs out, the last answer repeats, so an idle poller keeps
/// seeing a stable world.
pub struct ScriptedBackend {
    snapshots: Mutex<VecDeque<Result<Vec<Job>, String>>>,
    last_snapshot: Mutex<Result<Vec<Job>, String>>,
    submit_error: Mutex<Option<String>>,
    stop_error: Mutex<Option<String>>,
    stop_barrier: Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
    remote: Mutex<Option<RemoteInfo>>,
    next_id: Mutex<u64>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        ScriptedBackend {
            snapshots: Mutex::new(VecDeque::new()),
            last_snapshot: Mutex::new(Ok(Vec::new())),
            submit_error: Mutex::new(None),
            stop_error: Mutex::new(None),
            stop_barrier: Mutex::new(None),
            remote: Mutex::new(None),
            next_id: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedBackend {
    pub fn push_snapshot(&self, jobs: Vec<Job>) {
        self.snapshots.lock().unwrap().push_back(Ok(jobs));
    }

    pub fn push_snapshot_error(&self, message: &str) {
        self.snapshots.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn fail_submissions(&self, message: &str) {
        *self.submit_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_stops(&self, message: &str) {
        *self.stop_error.lock().unwrap() = Some(message.to_string());
    }

    /// The next stop call blocks until the returned sender fires.
    pub fn hold_stops(&self) -> tokio::sync::oneshot::Sender<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        *self.stop_barrier.lock().unwrap() = Some(rx);
        tx
    }

    pub fn set_remote_info(&self, info: RemoteInfo) {
        *self.remote.lock().unwrap() = Some(info);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == name || c.starts_with(&format!("{}:", name)))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_snapshot(&self) -> Result<Vec<Job>, BackendError> {
        let mut queue = self.snapshots.lock().unwrap();
        let entry = match queue.pop_front() {
            Some(entry) => {
                *self.last_snapshot.lock().unwrap() = entry.clone();
                entry
            }
            None => self.last_snapshot.lock().unwrap().clone(),
        };
        entry.map_err(BackendError::Rejected)
    }

    fn fresh_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("job-{}", next)
    }
}

impl Backend for ScriptedBackend {
    async fn media_metadata(&self, path: &Path) -> Result<Metadata, BackendError> {
        self.record(format!("media_metadata:{}", path.display()));
        Ok(Metadata {
            width: Some(1920),
            height: Some(1080),
            duration: Some(120.0),
            bitrate: Some(8_000_000),
            codec: Some("h264".to_string()),
            size: Some(1_000_000_000),
        })
    }

    async fn remote_info(&self, url: &str) -> Result<RemoteInfo, BackendError> {
        self.record(format!("remote_info:{}", url));
        match self.remote.lock().unwrap().clone() {
            Some(info) => Ok(info),
            None => Err(BackendError::NotFound(format!("no media at {}", url))),
        }
    }

    async fn start_conversion(&self, spec: &ConvertSpec) -> Result<Job, BackendError> {
        self.record("start_conversion".to_string());
        if let Some(message) = self.submit_error.lock().unwrap().clone() {
            return Err(BackendError::Rejected(message));
        }
        Ok(Job::queued(self.fresh_id(), ResolvedSpec::Convert(spec.clone())))
    }

    async fn start_download(&self, spec: &DownloadSpec) -> Result<Job, BackendError> {
        self.record("start_download".to_string());
        if let Some(message) = self.submit_error.lock().unwrap().clone() {
            return Err(BackendError::Rejected(message));
        }
        Ok(Job::queued(self.fresh_id(), ResolvedSpec::Download(spec.clone())))
    }

    async fn stop_job(&self, _kind: JobKind, id: &str) -> Result<(), BackendError> {
        self.record(format!("stop_job:{}", id));
        let barrier = self.stop_barrier.lock().unwrap().take();
        if let Some(barrier) = barrier {
            let _ = barrier.await;
        }
        if let Some(message) = self.stop_error.lock().unwrap().clone() {
            return Err(BackendError::Rejected(message));
        }
        Ok(())
    }

    async fn stop_all(&self, _kind: JobKind) -> Result<(), BackendError> {
        self.record("stop_all".to_string());
        if let Some(message) = self.stop_error.lock().unwrap().clone() {
            return Err(BackendError::Rejected(message));
        }
        Ok(())
    }

    async fn list_jobs(&self, _kind: JobKind) -> Result<Vec<Job>, BackendError> {
        self.record("list_jobs".to_string());
        self.next_snapshot()
    }

    async fn clear_history(&self, _kind: JobKind) -> Result<(), BackendError> {
        self.record("clear_history".to_string());
        Ok(())
    }
}
