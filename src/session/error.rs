use thiserror::Error;

use crate::session::protocol::Command;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Command {command} failed: {message}")]
    CommandFailed { command: Command, message: String },

    #[error("Analysis session closed")]
    Closed,
}
