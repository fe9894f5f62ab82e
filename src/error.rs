//! Error types for the transform engine.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransformError>;

/// Fatal errors. Call sites that cannot be rewritten are not errors; they
/// are recorded as skips in the [`TransformResult`](crate::TransformResult).
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{file}:{line}:{column}: failed to parse: {message}")]
    Parse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid transform options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("invalid exclude pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransformError {
    pub fn file(&self) -> Option<String> {
        match self {
            TransformError::Parse { file, .. } => Some(file.clone()),
            TransformError::Io { path, .. } => Some(path.display().to_string()),
            _ => None,
        }
    }
}
