//! Error types for plan document I/O

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing plan documents
#[derive(Debug, Error)]
pub enum PlanDocumentError {
    #[error("Failed to read plan document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid plan document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize plan: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for plan document operations
pub type PlanDocumentResult<T> = Result<T, PlanDocumentError>;
