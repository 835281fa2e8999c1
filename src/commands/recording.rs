//! Recording-related commands

use crate::config::ReplayConfig;
use crate::recorder::{BufferStatus, RecordingState, ReplayCoordinator};
use crate::utils::AppResult;
use std::sync::Arc;

/// Application state shared by all commands
pub struct RecorderState {
    pub coordinator: Arc<ReplayCoordinator>,

    /// Configuration used when capture is (re)started
    pub config: ReplayConfig,
}

impl RecorderState {
    pub fn new(coordinator: Arc<ReplayCoordinator>, config: ReplayConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }
}

/// Start continuous capture
pub async fn start_recording(state: &RecorderState, config: ReplayConfig) -> AppResult<()> {
    state.coordinator.start_continuous_capture(config).await?;
    Ok(())
}

/// Stop continuous capture, keeping the buffer
pub async fn stop_recording(state: &RecorderState) -> AppResult<()> {
    state.coordinator.stop_continuous_capture().await?;
    Ok(())
}

/// Get current recording state
pub fn get_recording_state(state: &RecorderState) -> RecordingState {
    state.coordinator.state()
}

/// Get a summary of the buffer
pub fn get_buffer_status(state: &RecorderState) -> BufferStatus {
    state.coordinator.status()
}
