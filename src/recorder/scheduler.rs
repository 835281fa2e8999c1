//! Capture scheduler
//!
//! Runs the capture-and-rotate loop on its own task. Each cycle records one
//! segment for the configured duration, finalizes it and hands it to the
//! store. Stop requests are only honored between cycles.

use super::clock::SegmentClock;
use super::state::{RecordingEvent, Segment};
use super::store::SegmentStore;
use crate::capture::{CaptureBackend, CaptureError, SegmentTarget};
use crate::storage::StorageBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Everything one rotation needs
pub struct Rotation {
    pub capture: Arc<dyn CaptureBackend>,
    pub store: Arc<SegmentStore>,
    pub storage: Arc<dyn StorageBackend>,
    pub clock: Arc<SegmentClock>,
    pub segment_dir: PathBuf,
    pub container: String,
    pub segment_duration: Duration,
    pub events: broadcast::Sender<RecordingEvent>,
}

enum CycleFailure {
    Begin(CaptureError),
    Finalize {
        location: PathBuf,
        error: CaptureError,
    },
}

impl Rotation {
    fn target(&self) -> SegmentTarget {
        let id = self.clock.next_id();
        SegmentTarget {
            id,
            location: self
                .segment_dir
                .join(format!("segment_{}.{}", id, self.container)),
            duration: self.segment_duration,
        }
    }

    /// Record, wait, finalize
    async fn capture_one(&self) -> Result<Segment, CycleFailure> {
        let target = self.target();
        let handle = self
            .capture
            .begin_segment(&target)
            .await
            .map_err(CycleFailure::Begin)?;

        tokio::time::sleep(self.segment_duration).await;

        let location = self
            .capture
            .end_segment(handle)
            .await
            .map_err(|error| CycleFailure::Finalize {
                location: target.location.clone(),
                error,
            })?;

        Ok(Segment::new(target.id, location, self.segment_duration))
    }

    /// Remove whatever a failed finalize left behind
    async fn discard_partial(&self, location: &Path) {
        match self.storage.delete(location).await {
            Ok(()) => tracing::debug!("Removed partial segment {:?}", location),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove partial segment {:?}: {}", location, e),
        }
    }

    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        tracing::info!(
            "Capture scheduler started ({}, {:?} segments into {:?})",
            self.capture.name(),
            self.segment_duration,
            self.segment_dir
        );

        let mut cycles = 0u64;
        loop {
            let stop_requested = *stop_rx.borrow();
            if stop_requested || stop_rx.has_changed().is_err() {
                break;
            }
            cycles += 1;

            match self.capture_one().await {
                Ok(segment) => {
                    let id = segment.id;
                    let duration_ms = segment.duration.as_millis() as u64;
                    let evicted = self.store.append(segment).await;

                    let _ = self
                        .events
                        .send(RecordingEvent::SegmentCaptured { id, duration_ms });
                    for segment in evicted {
                        let _ = self
                            .events
                            .send(RecordingEvent::SegmentEvicted { id: segment.id });
                    }
                }
                Err(CycleFailure::Begin(e)) => {
                    tracing::error!("Capture cycle {} could not start: {}", cycles, e);
                    let _ = self.events.send(RecordingEvent::CaptureFailed(e.to_string()));

                    // Nothing in flight, so a stop can cut the wait short.
                    tokio::select! {
                        _ = tokio::time::sleep(self.segment_duration) => {}
                        changed = stop_rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(CycleFailure::Finalize { location, error }) => {
                    tracing::error!("Capture cycle {} could not finalize: {}", cycles, error);
                    let _ = self
                        .events
                        .send(RecordingEvent::CaptureFailed(error.to_string()));
                    self.discard_partial(&location).await;
                }
            }
        }

        tracing::info!("Capture scheduler stopped after {} cycles", cycles);
    }
}

/// Handle to a running capture loop
pub struct CaptureScheduler {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CaptureScheduler {
    /// Start rotating on a new task
    pub fn spawn(rotation: Rotation) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(rotation.run(stop_rx));
        Self { stop_tx, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Ask the loop to stop at the next cycle boundary and wait for it.
    ///
    /// A segment being recorded when this is called is finalized and stored
    /// before this returns.
    pub async fn stop(self) {
        self.stop_tx.send_replace(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Capture scheduler task failed: {}", e);
        }
    }
}
