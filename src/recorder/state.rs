//! Recording state management
//!
//! Defines the recording state machine and the values that move between the
//! scheduler, the segment store and the export coordinator.

use super::clock::SegmentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current state of the replay buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Capture is not running
    Idle,
    /// Segments are being captured and rotated
    Recording,
    /// Capture is paused while the buffer is merged
    Exporting,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// One finished slice of continuous capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Creation timestamp, also the ordering and file name key
    pub id: SegmentId,

    /// Where the captured bytes live
    pub location: PathBuf,

    /// Nominal length of the segment
    pub duration: Duration,

    /// Wall-clock time the segment was finalized
    pub captured_at: DateTime<Utc>,
}

impl Segment {
    pub fn new(id: SegmentId, location: PathBuf, duration: Duration) -> Self {
        Self {
            id,
            location,
            duration,
            captured_at: Utc::now(),
        }
    }
}

/// Immutable, ordered view of the buffer taken when an export begins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSnapshot {
    segments: Vec<Segment>,
}

impl ExportSnapshot {
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total nominal duration covered by the snapshot
    pub fn duration(&self) -> Duration {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Segment locations in temporal order, as handed to the merge backend
    pub fn manifest(&self) -> Vec<PathBuf> {
        self.segments.iter().map(|s| s.location.clone()).collect()
    }

    pub fn ids(&self) -> Vec<SegmentId> {
        self.segments.iter().map(|s| s.id).collect()
    }
}

/// A successfully written replay file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedArtifact {
    pub id: SegmentId,

    /// Path of the merged output
    pub location: PathBuf,

    /// Number of segments merged
    pub segment_count: usize,

    /// Nominal duration of the merged output in milliseconds
    pub duration_ms: u64,

    pub created_at: DateTime<Utc>,
}

impl ExportedArtifact {
    pub(crate) fn new(id: SegmentId, location: &Path, snapshot: &ExportSnapshot) -> Self {
        Self {
            id,
            location: location.to_path_buf(),
            segment_count: snapshot.len(),
            duration_ms: snapshot.duration().as_millis() as u64,
            created_at: Utc::now(),
        }
    }
}

/// Point-in-time summary of the replay buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferStatus {
    pub state: RecordingState,
    pub segment_count: usize,
    pub buffered_duration_ms: u64,
    pub window_ms: u64,
    pub last_export: Option<ExportedArtifact>,
}

/// Events emitted while the buffer is running
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Continuous capture started
    Started,
    /// Continuous capture stopped
    Stopped,
    /// A segment was finalized and buffered
    SegmentCaptured { id: SegmentId, duration_ms: u64 },
    /// A segment fell out of the window
    SegmentEvicted { id: SegmentId },
    /// One rotation failed; capture continues with the next one
    CaptureFailed(String),
    /// Export began with this many segments
    ExportStarted { segments: usize },
    /// Export finished
    ExportCompleted(ExportedArtifact),
    /// Export failed
    ExportFailed(String),
}
