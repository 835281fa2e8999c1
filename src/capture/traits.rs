//! Capture trait definitions
//!
//! Platform-agnostic contract for recording one fixed-length segment.

use crate::recorder::clock::SegmentId;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Capture backend errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to start segment capture: {0}")]
    StartFailed(String),

    #[error("Failed to finalize segment capture: {0}")]
    StopFailed(String),

    #[error("No capture in progress for segment {0}")]
    UnknownSession(SegmentId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// What the scheduler asks the backend to record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTarget {
    pub id: SegmentId,

    /// Output file the segment must end up in
    pub location: PathBuf,

    /// Nominal segment length
    pub duration: Duration,
}

/// Handle for a segment capture that has begun but not been finalized
#[derive(Debug)]
pub struct SessionHandle {
    pub id: SegmentId,
    pub location: PathBuf,
}

impl SessionHandle {
    pub fn new(target: &SegmentTarget) -> Self {
        Self {
            id: target.id,
            location: target.location.clone(),
        }
    }
}

/// Source of fixed-length media segments
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Begin recording a segment into `target.location`
    async fn begin_segment(&self, target: &SegmentTarget) -> CaptureResult<SessionHandle>;

    /// Finalize a segment and return where the playable file lives
    async fn end_segment(&self, handle: SessionHandle) -> CaptureResult<PathBuf>;
}
