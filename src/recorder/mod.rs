//! Replay buffer core
//!
//! This module implements the rolling capture buffer:
//! - SegmentClock for time-ordered segment and replay names
//! - SegmentStore, the duration-bounded ring of finished segments
//! - CaptureScheduler, the capture-and-rotate loop
//! - ReplayCoordinator to start, stop and export

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod scheduler;
pub mod state;
pub mod store;

pub use clock::{SegmentClock, SegmentId};
pub use coordinator::ReplayCoordinator;
pub use error::{RecordingError, RecordingResult};
pub use scheduler::CaptureScheduler;
pub use state::{BufferStatus, ExportSnapshot, ExportedArtifact, RecordingEvent, RecordingState, Segment};
pub use store::SegmentStore;
