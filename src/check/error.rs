use thiserror::Error;

use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Cycle-level failures of a check
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Failed to open files: {0}")]
    Open(#[source] SessionError),

    #[error("Failed to close files: {0}")]
    Close(#[source] SessionError),
}
