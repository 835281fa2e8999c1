//! FFmpeg segment capture
//!
//! Records each segment with its own `ffmpeg` process limited to the segment
//! length, so every finished file is a complete, independently playable clip.

use super::traits::{CaptureBackend, CaptureError, CaptureResult, SegmentTarget, SessionHandle};
use crate::config::CaptureSettings;
use crate::recorder::clock::SegmentId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

/// Capture backend driving one FFmpeg process per segment
pub struct FfmpegCaptureBackend {
    settings: CaptureSettings,

    /// Running processes keyed by the segment they are writing
    active: Mutex<HashMap<SegmentId, Child>>,
}

impl FfmpegCaptureBackend {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Check that the configured ffmpeg binary can be executed
    pub async fn probe(&self) -> CaptureResult<()> {
        let output = Command::new(&self.settings.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CaptureError::StartFailed(format!(
                    "FFmpeg not found at {:?}: {}",
                    self.settings.ffmpeg_path, e
                ))
            })?;

        if !output.status.success() {
            return Err(CaptureError::StartFailed(format!(
                "FFmpeg -version exited with {}",
                output.status
            )));
        }
        Ok(())
    }

    /// Number of segments currently being written
    pub fn active_sessions(&self) -> usize {
        self.active.lock().len()
    }
}

/// Build the argument list for recording one segment
pub fn capture_args(settings: &CaptureSettings, target: &SegmentTarget) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];
    args.extend(settings.input_args.iter().cloned());
    args.extend([
        "-t".to_string(),
        format!("{:.3}", target.duration.as_secs_f64()),
    ]);
    args.extend(settings.output_args.iter().cloned());
    args.push(target.location.to_string_lossy().to_string());
    args
}

#[async_trait]
impl CaptureBackend for FfmpegCaptureBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn begin_segment(&self, target: &SegmentTarget) -> CaptureResult<SessionHandle> {
        let args = capture_args(&self.settings, target);
        tracing::debug!("Starting FFmpeg capture: {:?}", args);

        let child = Command::new(&self.settings.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::StartFailed(format!("Failed to start FFmpeg: {}", e)))?;

        self.active.lock().insert(target.id, child);
        Ok(SessionHandle::new(target))
    }

    async fn end_segment(&self, handle: SessionHandle) -> CaptureResult<PathBuf> {
        let mut child = self
            .active
            .lock()
            .remove(&handle.id)
            .ok_or(CaptureError::UnknownSession(handle.id))?;

        // Still running past its -t limit: ask it to finish the file cleanly.
        if child.try_wait()?.is_none() {
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(b"q").await {
                    tracing::debug!("FFmpeg stdin closed before quit for {}: {}", handle.id, e);
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CaptureError::StopFailed(format!("Failed to wait for FFmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::StopFailed(format!(
                "FFmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if tokio::fs::metadata(&handle.location).await.is_err() {
            return Err(CaptureError::StopFailed(format!(
                "Segment {} produced no file at {:?}",
                handle.id, handle.location
            )));
        }

        Ok(handle.location)
    }
}
