use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("source unavailable: {}: {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("source is not connected")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl SourceError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
