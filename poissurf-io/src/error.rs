//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Face references vertex {index} but only {count} vertices exist")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IoError> for poissurf_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => poissurf_core::Error::Io(e),
            IoError::InvalidFormat { format } => poissurf_core::Error::UnsupportedFormat(format),
            other => poissurf_core::Error::InvalidData(other.to_string()),
        }
    }
}
