//! Export error types

use thiserror::Error;

/// Merge backend errors
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Nothing to merge")]
    EmptyInput,

    #[error("Failed to write merge manifest: {0}")]
    Manifest(#[from] std::io::Error),

    #[error("Failed to start merge: {0}")]
    Spawn(String),

    #[error("Merge exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Errors returned to callers of `export_window`
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing buffered to export")]
    NothingBuffered,

    #[error("An export is already in progress")]
    AlreadyInProgress,

    #[error("Merge failed: {0}")]
    MergeFailed(#[from] MergeError),
}

impl From<ExportError> for String {
    fn from(e: ExportError) -> String {
        e.to_string()
    }
}
