//! Error types for file-backed collaborators.

use std::path::PathBuf;

use factorbeta_traits::CollaboratorError;

/// Errors that can occur while reading or writing local files.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// CSV error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A required column is absent from the header.
    #[error("{path}: missing column {column}")]
    MissingColumn {
        /// File read.
        path: PathBuf,
        /// Column name.
        column: String,
    },

    /// A row could not be interpreted.
    #[error("{path}, row {row}: {message}")]
    InvalidRow {
        /// File read.
        path: PathBuf,
        /// One-based data row.
        row: usize,
        /// What was wrong.
        message: String,
    },
}

impl From<IoError> for CollaboratorError {
    fn from(err: IoError) -> Self {
        match &err {
            IoError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Self::Rejected(err.to_string())
            }
            IoError::Io(_) => Self::Unavailable(err.to_string()),
            _ => Self::Malformed(err.to_string()),
        }
    }
}
