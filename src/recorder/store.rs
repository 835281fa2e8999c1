//! Rolling segment store
//!
//! Keeps finished segments oldest first and evicts from the head so that the
//! buffered duration stays between the window and one segment past it.

use super::state::{ExportSnapshot, Segment};
use crate::storage::StorageBackend;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

struct StoreInner {
    segments: VecDeque<Segment>,
    buffered: Duration,
    window: Duration,
}

impl StoreInner {
    /// Pop head segments while the rest still covers the window.
    ///
    /// Once the window has been filled the retained duration stays in
    /// `[window, window + segment)`.
    fn evict(&mut self) -> Vec<Segment> {
        let mut evicted = Vec::new();
        while let Some(head) = self.segments.front() {
            if self.segments.len() <= 1 || self.buffered - head.duration < self.window {
                break;
            }
            if let Some(segment) = self.segments.pop_front() {
                self.buffered -= segment.duration;
                evicted.push(segment);
            }
        }
        evicted
    }
}

/// Duration-bounded ring of captured segments
pub struct SegmentStore {
    inner: RwLock<StoreInner>,
    storage: Arc<dyn StorageBackend>,
}

impl SegmentStore {
    /// Create an empty store retaining at least `window` of content
    pub fn new(window: Duration, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                segments: VecDeque::new(),
                buffered: Duration::ZERO,
                window,
            }),
            storage,
        }
    }

    /// Add a segment at the tail and delete whatever falls out of the window.
    ///
    /// Returns the evicted segments. Delete failures are logged only; the
    /// store forgets an evicted segment whether or not its file went away.
    pub async fn append(&self, segment: Segment) -> Vec<Segment> {
        let evicted = self.insert(segment);
        self.release(&evicted).await;
        evicted
    }

    /// Bookkeeping half of `append`, without touching storage
    pub(crate) fn insert(&self, segment: Segment) -> Vec<Segment> {
        let mut inner = self.inner.write();
        if let Some(tail) = inner.segments.back() {
            if segment.id <= tail.id {
                tracing::warn!(
                    "Segment {} appended after newer segment {}",
                    segment.id,
                    tail.id
                );
            }
        }
        inner.buffered += segment.duration;
        inner.segments.push_back(segment);
        inner.evict()
    }

    async fn release(&self, segments: &[Segment]) {
        for segment in segments {
            match self.storage.delete(&segment.location).await {
                Ok(()) => tracing::debug!("Evicted segment {}", segment.id),
                Err(e) => tracing::warn!(
                    "Failed to delete evicted segment {} at {:?}: {}",
                    segment.id,
                    segment.location,
                    e
                ),
            }
        }
    }

    /// Current contents, oldest first
    pub fn snapshot(&self) -> ExportSnapshot {
        let inner = self.inner.read();
        ExportSnapshot::new(inner.segments.iter().cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.read().segments.len()
    }

    /// Sum of buffered segment durations
    pub fn buffered_duration(&self) -> Duration {
        self.inner.read().buffered
    }

    pub fn window(&self) -> Duration {
        self.inner.read().window
    }

    /// Change the retained window, evicting immediately if it shrank
    pub async fn set_window(&self, window: Duration) -> Vec<Segment> {
        let evicted = {
            let mut inner = self.inner.write();
            inner.window = window;
            inner.evict()
        };
        self.release(&evicted).await;
        evicted
    }

    /// Drop and delete every buffered segment
    pub async fn drain(&self) -> usize {
        let drained: Vec<Segment> = {
            let mut inner = self.inner.write();
            inner.buffered = Duration::ZERO;
            inner.segments.drain(..).collect()
        };
        self.release(&drained).await;
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::clock::SegmentId;
    use crate::testing::MemoryStorage;
    use proptest::prelude::*;
    use std::path::PathBuf;

    const SEGMENT: Duration = Duration::from_secs(5);
    const WINDOW: Duration = Duration::from_secs(30);

    fn segment(id: u64) -> Segment {
        segment_with(id, SEGMENT)
    }

    fn segment_with(id: u64, duration: Duration) -> Segment {
        Segment::new(
            SegmentId::new(id),
            PathBuf::from(format!("/buffer/segment_{}.mp4", id)),
            duration,
        )
    }

    fn store() -> (SegmentStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (SegmentStore::new(WINDOW, storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (store, _) = store();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(store.buffered_duration(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_no_eviction_below_window() {
        let (store, storage) = store();
        for id in 1..=6 {
            assert!(store.append(segment(id)).await.is_empty());
        }
        assert_eq!(store.len(), 6);
        assert_eq!(store.buffered_duration(), WINDOW);
        assert!(storage.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_seven_rotations_evict_oldest() {
        let (store, storage) = store();
        for id in 1..=7 {
            store.append(segment(id)).await;
        }

        let ids: Vec<u64> = store.snapshot().ids().iter().map(|id| id.as_u64()).collect();
        assert_eq!(ids, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(store.buffered_duration(), WINDOW);
        assert_eq!(storage.deleted(), vec![PathBuf::from("/buffer/segment_1.mp4")]);
    }

    #[tokio::test]
    async fn test_eviction_is_fifo() {
        let (store, storage) = store();
        for id in 1..=12 {
            store.append(segment(id)).await;
        }
        let deleted: Vec<PathBuf> = (1..=6)
            .map(|id| PathBuf::from(format!("/buffer/segment_{}.mp4", id)))
            .collect();
        assert_eq!(storage.deleted(), deleted);
    }

    #[tokio::test]
    async fn test_delete_failure_still_drops_segment() {
        let (store, storage) = store();
        storage.fail_deletes(true);
        for id in 1..=8 {
            store.append(segment(id)).await;
        }
        assert_eq!(store.len(), 6);
        assert_eq!(store.snapshot().ids()[0], SegmentId::new(3));
    }

    #[tokio::test]
    async fn test_short_segment_is_kept_until_window_is_covered() {
        let (store, _) = store();
        for id in 1..=6 {
            store.append(segment(id)).await;
        }
        store.append(segment_with(7, Duration::from_secs(2))).await;
        // Dropping segment 1 would leave 27s, below the window.
        assert_eq!(store.len(), 7);
        assert_eq!(store.buffered_duration(), Duration::from_secs(32));
    }

    #[tokio::test]
    async fn test_snapshot_unaffected_by_later_appends() {
        let (store, _) = store();
        for id in 1..=3 {
            store.append(segment(id)).await;
        }
        let snapshot = store.snapshot();
        store.append(segment(4)).await;

        assert_eq!(snapshot.len(), 3);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_shrinking_window_evicts() {
        let (store, storage) = store();
        for id in 1..=6 {
            store.append(segment(id)).await;
        }
        let evicted = store.set_window(Duration::from_secs(10)).await;
        assert_eq!(evicted.len(), 4);
        assert_eq!(store.len(), 2);
        assert_eq!(storage.deleted().len(), 4);
    }

    #[tokio::test]
    async fn test_drain_deletes_everything() {
        let (store, storage) = store();
        for id in 1..=4 {
            store.append(segment(id)).await;
        }
        assert_eq!(store.drain().await, 4);
        assert!(store.is_empty());
        assert_eq!(store.buffered_duration(), Duration::ZERO);
        assert_eq!(storage.deleted().len(), 4);
    }

    proptest! {
        #[test]
        fn buffered_duration_stays_within_bounds(
            segment_secs in 1u64..=10,
            window_secs in 1u64..=60,
            appends in 1usize..64,
        ) {
            let segment_len = Duration::from_secs(segment_secs);
            let window = Duration::from_secs(window_secs.max(segment_secs));
            let store = SegmentStore::new(window, Arc::new(MemoryStorage::new()));

            let mut appended = Duration::ZERO;
            for id in 0..appends {
                store.insert(segment_with(id as u64, segment_len));
                appended += segment_len;

                let buffered = store.buffered_duration();
                prop_assert!(buffered < window + segment_len);
                if appended >= window {
                    prop_assert!(buffered >= window);
                } else {
                    prop_assert_eq!(buffered, appended);
                }
            }

            let ids = store.snapshot().ids();
            prop_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert_eq!(ids.last().copied(), Some(SegmentId::new(appends as u64 - 1)));
        }
    }
}
