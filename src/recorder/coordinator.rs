//! Replay coordinator
//!
//! Owns the recording lifecycle and the Recording -> Exporting -> Recording
//! hand-off. Exports pause rotation, merge a snapshot of the buffer, then
//! resume capture whether or not the merge succeeded.

use super::clock::SegmentClock;
use super::error::{RecordingError, RecordingResult};
use super::scheduler::{CaptureScheduler, Rotation};
use super::state::{BufferStatus, ExportedArtifact, RecordingEvent, RecordingState};
use super::store::SegmentStore;
use crate::capture::CaptureBackend;
use crate::config::ReplayConfig;
use crate::export::{ExportError, MergeBackend};
use crate::storage::StorageBackend;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Clears the export flag when the export returns
struct ExportGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExportGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Continuous capture plus on-demand export of the buffered window
pub struct ReplayCoordinator {
    /// Current recording state
    state: Arc<RwLock<RecordingState>>,

    /// Active configuration, directories resolved once capture starts
    config: RwLock<ReplayConfig>,

    store: Arc<SegmentStore>,
    clock: Arc<SegmentClock>,
    capture: Arc<dyn CaptureBackend>,
    merger: Arc<dyn MergeBackend>,
    storage: Arc<dyn StorageBackend>,

    /// Running scheduler. The lock also serializes start, stop and export.
    scheduler: Mutex<Option<CaptureScheduler>>,

    /// Set while an export is in flight
    exporting: AtomicBool,

    last_export: RwLock<Option<ExportedArtifact>>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl ReplayCoordinator {
    pub fn new(
        config: ReplayConfig,
        capture: Arc<dyn CaptureBackend>,
        merger: Arc<dyn MergeBackend>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let store = Arc::new(SegmentStore::new(config.buffer_window(), storage.clone()));
        Self {
            state: Arc::new(RwLock::new(RecordingState::Idle)),
            config: RwLock::new(config),
            store,
            clock: Arc::new(SegmentClock::new()),
            capture,
            merger,
            storage,
            scheduler: Mutex::new(None),
            exporting: AtomicBool::new(false),
            last_export: RwLock::new(None),
            event_tx,
        }
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        *self.state.read()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> ReplayConfig {
        self.config.read().clone()
    }

    /// Most recent successful export
    pub fn last_export(&self) -> Option<ExportedArtifact> {
        self.last_export.read().clone()
    }

    pub fn status(&self) -> BufferStatus {
        BufferStatus {
            state: self.state(),
            segment_count: self.store.len(),
            buffered_duration_ms: self.store.buffered_duration().as_millis() as u64,
            window_ms: self.store.window().as_millis() as u64,
            last_export: self.last_export(),
        }
    }

    fn spawn_scheduler(&self, config: &ReplayConfig) -> CaptureScheduler {
        CaptureScheduler::spawn(Rotation {
            capture: self.capture.clone(),
            store: self.store.clone(),
            storage: self.storage.clone(),
            clock: self.clock.clone(),
            segment_dir: config.segment_dir.clone(),
            container: config.container.clone(),
            segment_duration: config.segment_duration(),
            events: self.event_tx.clone(),
        })
    }

    /// Start continuous capture
    pub async fn start_continuous_capture(&self, config: ReplayConfig) -> RecordingResult<()> {
        config
            .validate()
            .map_err(|e| RecordingError::InvalidConfig(e.to_string()))?;

        let mut slot = self.scheduler.lock().await;
        if slot.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }

        let mut config = config;
        config.segment_dir = self.storage.prepare_dir(&config.segment_dir).await?;
        config.export_dir = self.storage.prepare_dir(&config.export_dir).await?;

        tracing::info!(
            "Starting continuous capture: {}s segments, {}s window, segments in {:?}",
            config.segment_duration_seconds,
            config.buffer_window_seconds,
            config.segment_dir
        );

        self.store.set_window(config.buffer_window()).await;
        *slot = Some(self.spawn_scheduler(&config));
        *self.config.write() = config;
        *self.state.write() = RecordingState::Recording;
        let _ = self.event_tx.send(RecordingEvent::Started);

        Ok(())
    }

    /// Stop continuous capture once the in-flight segment is finalized.
    ///
    /// Buffered segments are kept and can still be exported.
    pub async fn stop_continuous_capture(&self) -> RecordingResult<()> {
        let mut slot = self.scheduler.lock().await;
        let scheduler = slot.take().ok_or(RecordingError::NotRecording)?;

        tracing::info!("Stopping continuous capture");
        scheduler.stop().await;

        *self.state.write() = RecordingState::Idle;
        let _ = self.event_tx.send(RecordingEvent::Stopped);

        tracing::info!("Continuous capture stopped with {} segments buffered", self.store.len());
        Ok(())
    }

    /// Merge the buffered window into one replay file.
    ///
    /// A second call while one is running fails with `AlreadyInProgress`
    /// rather than queueing. When capture was running it is paused for the
    /// merge and restarted afterwards, even if the merge failed.
    pub async fn export_window(&self) -> Result<ExportedArtifact, ExportError> {
        let _guard = ExportGuard::acquire(&self.exporting).ok_or(ExportError::AlreadyInProgress)?;
        let mut slot = self.scheduler.lock().await;

        if self.store.is_empty() {
            return Err(ExportError::NothingBuffered);
        }

        let resume = match slot.take() {
            Some(scheduler) => {
                *self.state.write() = RecordingState::Exporting;
                scheduler.stop().await;
                true
            }
            None => false,
        };

        let snapshot = self.store.snapshot();
        let config = self.config.read().clone();
        let id = self.clock.next_id();
        let output = config
            .export_dir
            .join(format!("replay_{}.{}", id, config.container));

        tracing::info!(
            "Exporting {} segments ({:?}) to {:?}",
            snapshot.len(),
            snapshot.duration(),
            output
        );
        let _ = self.event_tx.send(RecordingEvent::ExportStarted {
            segments: snapshot.len(),
        });

        let outcome = match self.merger.merge(&snapshot.manifest(), &output).await {
            Ok(()) => {
                let artifact = ExportedArtifact::new(id, &output, &snapshot);
                *self.last_export.write() = Some(artifact.clone());
                Ok(artifact)
            }
            Err(e) => {
                self.discard_output(&output).await;
                Err(ExportError::MergeFailed(e))
            }
        };

        if resume {
            *slot = Some(self.spawn_scheduler(&config));
            *self.state.write() = RecordingState::Recording;
        }

        match &outcome {
            Ok(artifact) => {
                tracing::info!("Export complete: {:?}", artifact.location);
                let _ = self
                    .event_tx
                    .send(RecordingEvent::ExportCompleted(artifact.clone()));
            }
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                let _ = self.event_tx.send(RecordingEvent::ExportFailed(e.to_string()));
            }
        }

        outcome
    }

    async fn discard_output(&self, output: &Path) {
        match self.storage.delete(output).await {
            Ok(()) => tracing::debug!("Removed partial export {:?}", output),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove partial export {:?}: {}", output, e),
        }
    }

    /// Delete every buffered segment
    pub async fn discard_buffer(&self) -> usize {
        let _slot = self.scheduler.lock().await;
        let count = self.store.drain().await;
        tracing::info!("Discarded {} buffered segments", count);
        count
    }

    /// Stop capture if running and delete the buffer
    pub async fn shutdown(&self) {
        match self.stop_continuous_capture().await {
            Ok(()) | Err(RecordingError::NotRecording) => {}
            Err(e) => tracing::warn!("Failed to stop capture during shutdown: {}", e),
        }
        self.discard_buffer().await;
    }
}
