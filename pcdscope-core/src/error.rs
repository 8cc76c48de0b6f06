//! Error types for pcdscope

use thiserror::Error;

/// Main error type for pcdscope operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown resource handle: {0}")]
    UnknownHandle(String),

    #[error("Load aborted: {0}")]
    Aborted(String),
}

/// Result type alias for pcdscope operations
pub type Result<T> = std::result::Result<T, Error>;
