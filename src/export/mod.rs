//! Replay export module
//!
//! Merge contract used by the export coordinator plus the FFmpeg concat
//! implementation.

pub mod ffmpeg;
pub mod merge;
pub mod types;

pub use ffmpeg::FfmpegConcatMerger;
pub use merge::MergeBackend;
pub use types::{ExportError, MergeError};
