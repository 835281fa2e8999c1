//! Segment naming clock
//!
//! Issues strictly increasing, time-ordered identifiers used as file name
//! keys for both buffered segments and exported replays.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Time-ordered identifier (milliseconds since the Unix epoch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(u64);

impl SegmentId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source shared by the scheduler and the export coordinator
#[derive(Debug, Default)]
pub struct SegmentClock {
    last: AtomicU64,
}

impl SegmentClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock that never issues an id at or below `floor`
    pub fn starting_after(floor: u64) -> Self {
        Self {
            last: AtomicU64::new(floor),
        }
    }

    /// Next identifier, strictly greater than every id issued before.
    ///
    /// Follows wall-clock milliseconds while the clock advances and bumps
    /// by one when it has not (or has stepped backwards).
    pub fn next_id(&self) -> SegmentId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        SegmentId(now.max(previous + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_strictly_increase() {
        let clock = SegmentClock::new();
        let mut last = clock.next_id();
        for _ in 0..10_000 {
            let next = clock.next_id();
            assert!(next > last, "{} should be greater than {}", next, last);
            last = next;
        }
    }

    #[test]
    fn test_ids_track_wall_clock() {
        let before = Utc::now().timestamp_millis() as u64;
        let id = SegmentClock::new().next_id();
        assert!(id.as_u64() >= before);
    }

    #[test]
    fn test_clock_ahead_of_wall_time_keeps_counting() {
        let far_future = Utc::now().timestamp_millis() as u64 + 3_600_000;
        let clock = SegmentClock::starting_after(far_future);
        assert_eq!(clock.next_id().as_u64(), far_future + 1);
        assert_eq!(clock.next_id().as_u64(), far_future + 2);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let clock = Arc::new(SegmentClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = clock.clone();
                std::thread::spawn(move || (0..1_000).map(|_| clock.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 4_000);
    }
}
