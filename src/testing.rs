//! In-memory backends for tests

use crate::capture::{CaptureBackend, CaptureError, CaptureResult, SegmentTarget, SessionHandle};
use crate::export::{MergeBackend, MergeError};
use crate::recorder::clock::SegmentId;
use crate::storage::StorageBackend;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Storage that only records what it was asked to do
#[derive(Default)]
pub struct MemoryStorage {
    deleted: Mutex<Vec<PathBuf>>,
    manifests: Mutex<Vec<(PathBuf, Vec<String>)>>,
    fail_deletes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn deleted(&self) -> Vec<PathBuf> {
        self.deleted.lock().clone()
    }

    pub fn manifests(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.manifests.lock().clone()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn delete(&self, location: &Path) -> io::Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "delete refused"));
        }
        self.deleted.lock().push(location.to_path_buf());
        Ok(())
    }

    async fn write_manifest(&self, lines: &[String]) -> io::Result<PathBuf> {
        let mut manifests = self.manifests.lock();
        let path = PathBuf::from(format!("/manifests/manifest_{}.txt", manifests.len()));
        manifests.push((path.clone(), lines.to_vec()));
        Ok(path)
    }

    async fn prepare_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        Ok(dir.to_path_buf())
    }
}

/// Capture backend that finishes instantly and can be told to fail
#[derive(Default)]
pub struct MockCapture {
    begun: Mutex<Vec<SegmentTarget>>,
    ended: Mutex<Vec<SegmentId>>,
    fail_begin_calls: Mutex<HashSet<usize>>,
    fail_end_calls: Mutex<HashSet<usize>>,
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th (1-based) call to `begin_segment`
    pub fn fail_begin_on(&self, call: usize) {
        self.fail_begin_calls.lock().insert(call);
    }

    /// Fail the n-th (1-based) call to `end_segment`
    pub fn fail_end_on(&self, call: usize) {
        self.fail_end_calls.lock().insert(call);
    }

    pub fn begun(&self) -> Vec<SegmentTarget> {
        self.begun.lock().clone()
    }

    pub fn begin_count(&self) -> usize {
        self.begun.lock().len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// True if two segments were ever captured at the same time
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureBackend for MockCapture {
    fn name(&self) -> &str {
        "mock"
    }

    async fn begin_segment(&self, target: &SegmentTarget) -> CaptureResult<SessionHandle> {
        let call = {
            let mut begun = self.begun.lock();
            begun.push(target.clone());
            begun.len()
        };
        if self.fail_begin_calls.lock().contains(&call) {
            return Err(CaptureError::StartFailed(format!("scripted failure #{}", call)));
        }
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        Ok(SessionHandle::new(target))
    }

    async fn end_segment(&self, handle: SessionHandle) -> CaptureResult<PathBuf> {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let call = {
            let mut ended = self.ended.lock();
            ended.push(handle.id);
            ended.len()
        };
        if self.fail_end_calls.lock().contains(&call) {
            return Err(CaptureError::StopFailed(format!("scripted failure #{}", call)));
        }
        Ok(handle.location)
    }
}

/// Merge backend that records its inputs
#[derive(Default)]
pub struct MockMerger {
    calls: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
    fail: AtomicBool,
    delay: Mutex<Duration>,
}

impl MockMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<(Vec<PathBuf>, PathBuf)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MergeBackend for MockMerger {
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MergeError> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().push((inputs.to_vec(), output.to_path_buf()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(MergeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "scripted merge failure".to_string(),
            });
        }
        Ok(())
    }
}
