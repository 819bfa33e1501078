//! Live worker pool counters, shared by all workers

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by every worker as batches complete
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Batches delivered successfully
    delivered: AtomicU64,
    /// Items in delivered batches
    items: AtomicU64,
    /// Uncompressed bytes delivered
    raw_bytes: AtomicU64,
    /// Request body bytes (after compression)
    body_bytes: AtomicU64,
    /// Batches discarded because loading is disabled
    discarded: AtomicU64,
    /// Delivery failures
    failures: AtomicU64,
}

impl PoolMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one delivered batch
    pub fn record_delivery(&self, items: usize, raw_bytes: usize, body_bytes: usize) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.items.fetch_add(items as u64, Ordering::Relaxed);
        self.raw_bytes.fetch_add(raw_bytes as u64, Ordering::Relaxed);
        self.body_bytes.fetch_add(body_bytes as u64, Ordering::Relaxed);
    }

    pub fn inc_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered: self.delivered(),
            items: self.items.load(Ordering::Relaxed),
            raw_bytes: self.raw_bytes.load(Ordering::Relaxed),
            body_bytes: self.body_bytes.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            failures: self.failures(),
        }
    }
}

/// Snapshot of pool metrics (for progress reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub delivered: u64,
    pub items: u64,
    pub raw_bytes: u64,
    pub body_bytes: u64,
    pub discarded: u64,
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = PoolMetrics::new();
        metrics.record_delivery(1000, 64_000, 9_000);
        metrics.record_delivery(500, 32_000, 4_000);
        metrics.inc_discarded();
        metrics.inc_failures();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                delivered: 2,
                items: 1500,
                raw_bytes: 96_000,
                body_bytes: 13_000,
                discarded: 1,
                failures: 1,
            }
        );
    }
}
