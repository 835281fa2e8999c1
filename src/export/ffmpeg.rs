//! FFmpeg concat merge
//!
//! Joins buffered segments with the concat demuxer and stream copy, so the
//! replay holds exactly the captured packets without re-encoding.

use super::merge::MergeBackend;
use super::types::MergeError;
use crate::storage::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Merge backend using `ffmpeg -f concat -c copy`
pub struct FfmpegConcatMerger {
    ffmpeg_path: PathBuf,
    storage: Arc<dyn StorageBackend>,
}

impl FfmpegConcatMerger {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            storage,
        }
    }
}

/// One concat demuxer line; single quotes are closed, escaped and reopened
pub fn concat_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{}'", escaped)
}

/// Build the argument list for a stream-copy concat
pub fn concat_args(manifest: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        manifest.to_string_lossy().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

#[async_trait]
impl MergeBackend for FfmpegConcatMerger {
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MergeError> {
        if inputs.is_empty() {
            return Err(MergeError::EmptyInput);
        }

        let lines: Vec<String> = inputs.iter().map(|p| concat_entry(p)).collect();
        let manifest = self.storage.write_manifest(&lines).await?;

        let args = concat_args(&manifest, output);
        tracing::info!("Starting FFmpeg concat: {:?}", args);

        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        if let Err(e) = self.storage.delete(&manifest).await {
            tracing::warn!("Failed to remove merge manifest {:?}: {}", manifest, e);
        }

        let output_status =
            result.map_err(|e| MergeError::Spawn(format!("Failed to start FFmpeg: {}", e)))?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(MergeError::Failed {
                status: output_status.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        tracing::info!("FFmpeg concat finished: {} segments -> {:?}", inputs.len(), output);
        Ok(())
    }
}
