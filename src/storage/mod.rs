//! Storage backend
//!
//! File deletion and transient manifest handling for buffered segments.

pub mod fs;
pub mod traits;

pub use fs::FsStorage;
pub use traits::StorageBackend;
