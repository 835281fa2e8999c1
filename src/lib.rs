//! Instant Replay - keep the last few seconds of capture, save them on demand.
//!
//! Captures fixed-length segments continuously into a rolling buffer bounded
//! by duration, and merges the buffered window into one file when asked.

pub mod capture;
pub mod commands;
pub mod config;
pub mod export;
pub mod recorder;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Context;
use capture::FfmpegCaptureBackend;
use commands::RecorderState;
use config::ReplayConfig;
use export::FfmpegConcatMerger;
use recorder::{RecordingEvent, ReplayCoordinator};
use std::path::PathBuf;
use std::sync::Arc;
use storage::{FsStorage, StorageBackend};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run the console application
pub fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "instant_replay_lib=debug,instant_replay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Instant Replay v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ReplayConfig::resolve(config_path).context("Failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(serve(config))
}

async fn serve(config: ReplayConfig) -> anyhow::Result<()> {
    let storage: Arc<dyn StorageBackend> = Arc::new(FsStorage::new(config.segment_dir.clone()));

    let capture = FfmpegCaptureBackend::new(config.capture.clone());
    capture
        .probe()
        .await
        .context("FFmpeg is required for capture")?;

    let merger = FfmpegConcatMerger::new(config.capture.ffmpeg_path.clone(), storage.clone());
    let coordinator = Arc::new(ReplayCoordinator::new(
        config.clone(),
        Arc::new(capture),
        Arc::new(merger),
        storage,
    ));

    tokio::spawn(log_events(coordinator.subscribe()));

    let state = RecorderState::new(coordinator.clone(), config.clone());
    commands::recording::start_recording(&state, config)
        .await
        .context("Failed to start continuous capture")?;

    let console = commands::run_console(&state).await;

    coordinator.shutdown().await;
    tracing::info!("Instant Replay stopped");

    console.context("Console failed")
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<RecordingEvent>) {
    loop {
        match events.recv().await {
            Ok(RecordingEvent::SegmentCaptured { id, duration_ms }) => {
                tracing::debug!("Segment {} captured ({}ms)", id, duration_ms)
            }
            Ok(RecordingEvent::SegmentEvicted { id }) => tracing::debug!("Segment {} evicted", id),
            Ok(RecordingEvent::CaptureFailed(message)) => {
                tracing::warn!("Capture cycle failed: {}", message)
            }
            Ok(RecordingEvent::ExportCompleted(artifact)) => {
                tracing::info!("Replay saved to {:?}", artifact.location)
            }
            Ok(event) => tracing::debug!("Recording event: {:?}", event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Event log fell behind by {} events", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    }
}
