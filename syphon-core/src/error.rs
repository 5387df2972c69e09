use std::path::PathBuf;

use arrow_schema::ArrowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyphonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no such file @ {0}")]
    NotFound(PathBuf),

    #[error("file already exists @ {0}")]
    AlreadyExists(PathBuf),

    #[error("not a regular file @ {0}")]
    NotAFile(PathBuf),

    #[error("cannot find schema-required column \"{0}\"")]
    MissingColumn(String),

    #[error("no value exists under the \"{0}\" column")]
    MissingValue(String),

    #[error("more than one value exists under the \"{0}\" column")]
    AmbiguousValue(String),

    #[error("more than one metadata value exists under the \"{0}\" column")]
    InconsistentMetadata(String),

    #[error("malformed hash entry \"{0}\"")]
    MalformedLine(String),

    #[error("hash algorithm mismatch: log uses {expected}, entry uses {found}")]
    HashAlgorithmMismatch { expected: String, found: String },

    #[error("unknown hash algorithm \"{0}\"")]
    UnknownHashAlgorithm(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("CSV error: {0}")]
    Csv(#[from] ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyphonError {
    /// Column or line a validation error refers to, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            SyphonError::MissingColumn(s)
            | SyphonError::MissingValue(s)
            | SyphonError::AmbiguousValue(s)
            | SyphonError::InconsistentMetadata(s)
            | SyphonError::MalformedLine(s) => Some(s),
            _ => None,
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, SyphonError>;
