//! Recording lifecycle errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Continuous capture is already running")]
    AlreadyRecording,

    #[error("Continuous capture is not running")]
    NotRecording,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RecordingError> for String {
    fn from(e: RecordingError) -> String {
        e.to_string()
    }
}

pub type RecordingResult<T> = Result<T, RecordingError>;
