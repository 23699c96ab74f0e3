//! Signature Dedup Cache
//!
//! Bounded, insertion-ordered cache of transaction signatures already
//! inspected by the wallet monitor. Eviction is deterministic: when the
//! cache grows past capacity, the oldest half is dropped in one batch so
//! eviction cost stays amortized across inserts.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// Default maximum number of retained signatures
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct CacheInner {
    order: VecDeque<String>,
    members: HashSet<String>,
}

/// Thread-safe signature cache shared by all wallet workers.
///
/// Idempotence guarantee: after `mark_seen(x)`, every `seen(x)` returns true
/// until `x` is evicted by capacity pressure.
#[derive(Debug)]
pub struct SignatureCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl SignatureCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Has this signature been inspected before?
    pub fn seen(&self, signature: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.members.contains(signature)
    }

    /// Record a signature as inspected. Re-marking an already seen signature
    /// is a no-op and does not refresh its eviction order.
    pub fn mark_seen(&self, signature: &str) {
        self.mark_if_unseen(signature);
    }

    /// Check-and-mark in one lock acquisition. Returns true when the
    /// signature was newly inserted (i.e. the caller should process it).
    pub fn mark_if_unseen(&self, signature: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.members.contains(signature) {
            return false;
        }
        inner.members.insert(signature.to_string());
        inner.order.push_back(signature.to_string());

        if inner.order.len() > self.capacity {
            let evict = self.capacity / 2;
            for _ in 0..evict {
                if let Some(old) = inner.order.pop_front() {
                    inner.members.remove(&old);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_mark_and_seen() {
        let cache = SignatureCache::new(100);
        assert!(!cache.seen("sig1"));
        cache.mark_seen("sig1");
        assert!(cache.seen("sig1"));
        assert!(!cache.seen("sig2"));
    }

    #[test]
    fn test_mark_idempotent() {
        let cache = SignatureCache::new(100);
        cache.mark_seen("sig1");
        cache.mark_seen("sig1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_mark_if_unseen() {
        let cache = SignatureCache::new(100);
        assert!(cache.mark_if_unseen("sig1"));
        assert!(!cache.mark_if_unseen("sig1"));
        assert!(cache.seen("sig1"));
    }

    #[test]
    fn test_eviction_drops_oldest_half() {
        let cache = SignatureCache::new(10);
        for i in 0..11 {
            cache.mark_seen(&format!("sig{}", i));
        }
        // Capacity exceeded at insert 11: oldest 5 evicted
        assert_eq!(cache.len(), 6);
        for i in 0..5 {
            assert!(!cache.seen(&format!("sig{}", i)), "sig{} should be evicted", i);
        }
        for i in 5..11 {
            assert!(cache.seen(&format!("sig{}", i)), "sig{} should be retained", i);
        }
    }

    #[test]
    fn test_eviction_order_is_insertion_order() {
        let cache = SignatureCache::new(4);
        cache.mark_seen("a");
        cache.mark_seen("b");
        cache.mark_seen("c");
        cache.mark_seen("d");
        cache.mark_seen("e"); // evicts a, b
        assert!(!cache.seen("a"));
        assert!(!cache.seen("b"));
        assert!(cache.seen("c"));
        assert!(cache.seen("d"));
        assert!(cache.seen("e"));
    }

    #[test]
    fn test_concurrent_marking() {
        let cache = Arc::new(SignatureCache::new(10_000));
        let mut handles = Vec::new();
        for t in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    cache.mark_seen(&format!("worker{}-sig{}", t, i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 2000);
    }
}
