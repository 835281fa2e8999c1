//! Segment capture backends
//!
//! The scheduler only depends on the `CaptureBackend` trait; FFmpeg is the
//! bundled implementation.

pub mod ffmpeg;
pub mod traits;

pub use ffmpeg::FfmpegCaptureBackend;
pub use traits::{CaptureBackend, CaptureError, CaptureResult, SegmentTarget, SessionHandle};
