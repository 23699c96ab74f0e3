//! Monitor Statistics
//!
//! Lock-protected counters with a snapshot read method for external
//! monitoring. No mutable access leaks out of this module.

use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub events_processed: u64,
    pub buys_detected: u64,
    pub sells_detected: u64,
    pub creates_detected: u64,
    pub errors: u64,
}

#[derive(Debug, Default)]
pub struct TrackerStats {
    inner: Mutex<StatsSnapshot>,
}

impl TrackerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_buy(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.events_processed += 1;
        inner.buys_detected += 1;
    }

    pub fn record_sell(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.events_processed += 1;
        inner.sells_detected += 1;
    }

    pub fn record_create(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.events_processed += 1;
        inner.creates_detected += 1;
    }

    pub fn record_error(&self) {
        self.inner.lock().unwrap().errors += 1;
    }

    /// Read-only snapshot of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters() {
        let stats = TrackerStats::new();
        stats.record_buy();
        stats.record_buy();
        stats.record_sell();
        stats.record_create();
        stats.record_error();

        // Every detection counts into the events total
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.events_processed, 4);
        assert_eq!(snapshot.buys_detected, 2);
        assert_eq!(snapshot.sells_detected, 1);
        assert_eq!(snapshot.creates_detected, 1);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn test_snapshot_is_copy() {
        let stats = TrackerStats::new();
        let before = stats.snapshot();
        stats.record_buy();
        // Snapshot taken earlier does not observe later mutation
        assert_eq!(before.buys_detected, 0);
        assert_eq!(stats.snapshot().buys_detected, 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let stats = Arc::new(TrackerStats::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..250 {
                    stats.record_buy();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().buys_detected, 1000);
    }
}
