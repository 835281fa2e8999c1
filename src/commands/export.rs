//! Export commands

use super::recording::RecorderState;
use crate::recorder::ExportedArtifact;
use crate::utils::AppResult;

/// Save the buffered window as one replay file
pub async fn save_replay(state: &RecorderState) -> AppResult<ExportedArtifact> {
    let artifact = state.coordinator.export_window().await?;
    Ok(artifact)
}

/// Most recent successful replay, if any
pub fn get_last_export(state: &RecorderState) -> Option<ExportedArtifact> {
    state.coordinator.last_export()
}
