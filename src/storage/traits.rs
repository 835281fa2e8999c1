//! Storage trait definitions

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Where segments, manifests and replays are created and removed
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Remove a file
    async fn delete(&self, location: &Path) -> io::Result<()>;

    /// Write a transient manifest, one entry per line, and return its path
    async fn write_manifest(&self, lines: &[String]) -> io::Result<PathBuf>;

    /// Make sure a directory exists and return its absolute path
    async fn prepare_dir(&self, dir: &Path) -> io::Result<PathBuf>;
}
