use thiserror::Error;

/// A required field is missing or cannot be resolved before submission.
/// Recovered locally and surfaced inline; never reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no input file or URL selected")]
    MissingSource,
    #[error("no output format selected")]
    MissingFormat,
    #[error("no destination folder selected")]
    MissingDestination,
    /// Catalog lookup yielded no valid codec/engine for the chosen
    /// container.
    #[error("cannot resolve encoding parameters: {0}")]
    Resolution(String),
}

/// A submit/stop/clear/list call to the backend was rejected or failed.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("tool failed: {0}")]
    Tool(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Remote metadata lookup produced nothing usable. Surfaced as a blocking
/// message in the submission form; no job is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteInfoError {
    #[error("no downloadable formats found")]
    NoFormats,
    #[error("failed to fetch media information: {0}")]
    Fetch(String),
}
