//! RunStats - final aggregate of one pipeline execution

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Final throughput/accounting record
///
/// Built once by the orchestrator after the scanner finished and every
/// worker drained the queue; immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Items scanned
    pub items: u64,
    /// Bytes scanned (sum of submitted batch sizes)
    pub bytes: u64,
    /// Values announced by the dataset
    pub values: u64,
    /// Batches submitted to the queue
    pub batches: u64,
    /// Concurrent workers
    pub workers: usize,
    /// Pipeline start to last worker completion
    pub duration: Duration,
}

impl RunStats {
    fn per_sec(&self, count: u64) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            count as f64 / secs
        } else {
            0.0
        }
    }

    /// Items per second
    pub fn items_rate(&self) -> f64 {
        self.per_sec(self.items)
    }

    /// Bytes per second
    pub fn bytes_rate(&self) -> f64 {
        self.per_sec(self.bytes)
    }

    /// Values per second
    pub fn values_rate(&self) -> f64 {
        self.per_sec(self.values)
    }

    /// One-line human readable summary
    pub fn summary_line(&self) -> String {
        format!(
            "loaded {} items in {:.6}sec with {} workers (mean point rate {:.2} items/sec, mean value rate {:.2}/s, {:.2}MB/sec from stdin)",
            self.items,
            self.duration.as_secs_f64(),
            self.workers,
            self.items_rate(),
            self.values_rate(),
            self.bytes_rate() / (1 << 20) as f64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = RunStats {
            items: 5000,
            bytes: 2 * 1024 * 1024,
            values: 10_000,
            batches: 5,
            workers: 4,
            duration: Duration::from_secs(2),
        };
        assert!((stats.items_rate() - 2500.0).abs() < 1e-9);
        assert!((stats.values_rate() - 5000.0).abs() < 1e-9);
        assert!((stats.bytes_rate() - 1024.0 * 1024.0).abs() < 1e-9);
        assert!(stats.summary_line().starts_with("loaded 5000 items"));
        assert!(stats.summary_line().contains("1.00MB/sec"));
    }

    #[test]
    fn test_zero_duration_rates() {
        let stats = RunStats {
            items: 10,
            ..Default::default()
        };
        assert_eq!(stats.items_rate(), 0.0);
    }
}
