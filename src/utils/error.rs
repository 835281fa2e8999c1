//! Error types and handling
//!
//! Application-wide error type and the response shape reported to callers.

use crate::export::ExportError;
use crate::recorder::RecordingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Error response for callers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Recording(RecordingError::AlreadyRecording) => "ALREADY_RECORDING",
            AppError::Recording(RecordingError::NotRecording) => "NOT_RECORDING",
            AppError::Recording(_) => "RECORDING_ERROR",
            AppError::Export(ExportError::NothingBuffered) => "NOTHING_BUFFERED",
            AppError::Export(ExportError::AlreadyInProgress) => "EXPORT_IN_PROGRESS",
            AppError::Export(ExportError::MergeFailed(_)) => "MERGE_FAILED",
            AppError::UnknownCommand(_) => "UNKNOWN_COMMAND",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
