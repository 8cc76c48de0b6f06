//! Error types for decoding and fetching

use thiserror::Error;

/// Errors that can occur while fetching or decoding point cloud assets
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("No source can fetch {location}")]
    UnsupportedLocation { location: String },

    #[error("HTTP request for {location} failed: {message}")]
    Http { location: String, message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Decompression error: {message}")]
    Decompression { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        IoError::ParseError {
            message: message.into(),
        }
    }
}

impl From<IoError> for pcdscope_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => pcdscope_core::Error::Io(e),
            IoError::ParseError { message } | IoError::Decompression { message } => {
                pcdscope_core::Error::InvalidData(message)
            }
            IoError::UnsupportedLocation { location } => {
                pcdscope_core::Error::UnsupportedFormat(location)
            }
            other @ (IoError::FileNotFound { .. } | IoError::Http { .. }) => {
                pcdscope_core::Error::Fetch(other.to_string())
            }
        }
    }
}
