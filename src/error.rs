//! Error type shared by every stage of the mirror.
//!
//! Whether an error is fatal is decided by the caller. Index-stage and startup
//! errors abort the process. Everything raised while handling a single module
//! or entry is logged and degraded to an empty contribution.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("request to '{url}' returned HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("fetching reports for '{module}' timed out after {}s", after.as_secs_f64())]
    Timeout { module: String, after: Duration },

    #[error("failed to start fetch worker for '{module}': {source}")]
    Spawn {
        module: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fetch worker for '{module}' exited without a result")]
    WorkerExited { module: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse response body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid path '{path}': {reason}")]
    PathEncoding { path: String, reason: &'static str },
}

impl MirrorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MirrorError> = std::result::Result<T, E>;
