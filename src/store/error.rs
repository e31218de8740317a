//! Store error types.
//!
//! Only writes and the change watcher can fail. Reads never surface an
//! error: a missing or malformed slot is treated as the default state.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting or watching the state slot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the slot (or its temporary file) failed.
    #[error("failed to write timer state to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state could not be serialized.
    #[error("failed to serialize timer state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The slot path has no file name to watch.
    #[error("state file path has no file name: {0}")]
    InvalidPath(PathBuf),

    /// The filesystem watcher could not be started.
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl StoreError {
    /// Returns true if this error came from the change watcher.
    #[must_use]
    pub fn is_watch_error(&self) -> bool {
        matches!(self, Self::Watch { .. } | Self::InvalidPath(_))
    }
}
