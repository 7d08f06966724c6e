// Job lifecycle and parameter resolution engine

pub mod backend;
pub mod catalog;
pub mod config;
pub mod dialog;
pub mod error;
pub mod jobs;
pub mod orchestrator;
pub mod poller;
pub mod registry;
pub mod selection;

// Re-export commonly used types
pub use backend::{Backend, Metadata, RemoteFormat, RemoteInfo};
pub use catalog::{Catalog, MediaKind, Quality};
pub use config::AppConfig;
pub use error::{BackendError, RemoteInfoError, SelectionError};
pub use jobs::{Job, JobKind, JobStatus, ResolvedSpec};
pub use orchestrator::Orchestrator;
pub use poller::Poller;
pub use registry::{JobRegistry, Partition, SharedRegistry};
pub use selection::{ConvertSelection, DownloadSelection};
