use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::Quality;

/// One tracked unit of work: either a media conversion or a media download.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    // Identity, assigned by the backend at submission time
    pub id: String,
    pub kind: JobKind,

    // Status
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    pub error: Option<String>,

    // What the job operates on
    pub source: String,
    pub destination: String,
    pub resolved: ResolvedSpec,

    // Timestamps
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Fresh queued job; source/destination labels are derived from the
    /// resolved parameter set.
    pub fn queued(id: String, resolved: ResolvedSpec) -> Job {
        Job {
            id,
            kind: resolved.kind(),
            status: JobStatus::Queued,
            progress: 0,
            speed: None,
            eta: None,
            error: None,
            source: resolved.source_label(),
            destination: resolved.destination_label(),
            resolved,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Convert,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Errored,
    Stopped,
}

impl JobStatus {
    /// Queued and Running jobs belong to the Active partition.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    /// Completed, Errored and Stopped are terminal; nothing leaves them
    /// except removal from the registry.
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

/// Fully validated, backend-submittable parameter set produced by the
/// resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedSpec {
    Convert(ConvertSpec),
    Download(DownloadSpec),
}

impl ResolvedSpec {
    pub fn kind(&self) -> JobKind {
        match self {
            ResolvedSpec::Convert(_) => JobKind::Convert,
            ResolvedSpec::Download(_) => JobKind::Download,
        }
    }

    pub fn source_label(&self) -> String {
        match self {
            ResolvedSpec::Convert(spec) => spec.input.display().to_string(),
            ResolvedSpec::Download(spec) => spec.url.clone(),
        }
    }

    pub fn destination_label(&self) -> String {
        match self {
            ResolvedSpec::Convert(spec) => spec.output_dir.display().to_string(),
            ResolvedSpec::Download(spec) => spec.output_dir.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConvertSpec {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub container: String,
    pub quality: Quality,
    /// Absent for audio-only containers.
    pub video: Option<VideoParams>,
    pub audio: AudioParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoParams {
    pub codec: String,
    pub engine: String,
    pub bitrate: String,
    pub resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framerate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioParams {
    pub codec: String,
    pub engine: String,
    pub bitrate: String,
    pub sample_rate: String,
    pub channels: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadSpec {
    pub url: String,
    pub output_dir: PathBuf,
    pub format_id: String,
    /// Target container the downloaded media is remuxed into.
    pub container: String,
    pub audio_quality: String,
    pub video_quality: String,
}
