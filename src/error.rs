use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an unexpected status; the payload is its message verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("Malformed service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} already exists, refusing to overwrite it")]
    TargetExists(PathBuf),

    #[error("Unable to determine image type of downloaded data")]
    UnknownImageType,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Invalid archive entry: {0}")]
    InvalidArchiveEntry(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CompressionError>;
