//! Merge backend trait

use super::types::MergeError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Concatenates finished segments into one output file
#[async_trait]
pub trait MergeBackend: Send + Sync {
    /// Join `inputs` in the given order into `output`.
    ///
    /// Inputs are expected to share format parameters; mixed inputs are
    /// passed through and the result depends on the backend.
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MergeError>;
}
