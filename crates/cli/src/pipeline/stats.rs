//! Run accounting: turns final scanner counters into `RunStats`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use contracts::{LoadConfig, LoadReport, ReportConfig, RunStats, SinkType, TargetConfig};
use ingestion::ScanStats;
use observability::StatsSummary;

use super::RunOutcome;

/// Measures one run from pipeline start to last worker completion
#[derive(Debug, Clone, Copy)]
pub struct RunAccountant {
    started: Instant,
    workers: usize,
}

impl RunAccountant {
    /// Start the wall clock
    pub fn start(workers: usize) -> Self {
        Self {
            started: Instant::now(),
            workers,
        }
    }

    /// Elapsed time so far
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Freeze the counters once the scanner and every worker are done
    pub fn finish(self, scan: &ScanStats) -> RunStats {
        Self::compute(scan, self.workers, self.started.elapsed())
    }

    /// Build `RunStats` for a known duration
    pub fn compute(scan: &ScanStats, workers: usize, duration: Duration) -> RunStats {
        RunStats {
            items: scan.items,
            bytes: scan.bytes,
            values: scan.values,
            batches: scan.batches,
            workers,
            duration,
        }
    }

    /// Structured result record for the reporter
    pub fn load_report(
        stats: &RunStats,
        load: &LoadConfig,
        targets: &[TargetConfig],
        report: &ReportConfig,
        hostname: &str,
    ) -> LoadReport {
        LoadReport {
            db_type: report.db_type.clone(),
            hostname: hostname.to_string(),
            destination: destination_label(targets),
            workers: stats.workers,
            batch_size: load.batch_size,
            item_limit: load.item_limit,
            gzip: load.gzip,
            tags: report.tags.clone(),
            items: stats.items,
            items_rate: stats.items_rate(),
            values_rate: stats.values_rate(),
            bytes_rate: stats.bytes_rate(),
            duration_secs: stats.duration.as_secs_f64(),
        }
    }
}

/// Comma separated delivery targets (URL for HTTP targets, name otherwise)
pub fn destination_label(targets: &[TargetConfig]) -> String {
    targets
        .iter()
        .map(|t| match (t.sink_type, t.params.get("url")) {
            (SinkType::Http, Some(url)) => url.clone(),
            (SinkType::File, _) => t
                .params
                .get("path")
                .cloned()
                .unwrap_or_else(|| t.name.clone()),
            _ => t.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Print per-run details after the summary line
pub fn print_details(outcome: &RunOutcome) {
    let scan = &outcome.scan;
    let pool = &outcome.pool;

    println!("\n=== Load Statistics ===");
    println!("   ├─ Lines read: {}", scan.lines);
    println!("   ├─ Items read: {}", scan.items);
    println!("   ├─ Batches: {}", scan.batches);
    match scan.expected {
        Some(expected) => println!(
            "   ├─ Dataset size: {} items, {} values",
            expected.items, expected.values
        ),
        None => println!("   ├─ Dataset size: unknown"),
    }
    if scan.limit_reached {
        println!("   ├─ Item limit reached");
    }
    if pool.discarded() > 0 {
        println!("   ├─ Batches discarded (load disabled): {}", pool.discarded());
    }
    println!("   ├─ Body bytes sent: {}", pool.body_bytes());
    println!(
        "   ├─ Buffers: {} allocated, {} reused",
        outcome.buffers.allocated, outcome.buffers.reused
    );
    println!("   └─ Body size: {}", StatsSummary::from(&pool.body_size()));

    let per_destination: BTreeMap<String, u64> = pool.batches_per_destination();
    if !per_destination.is_empty() {
        println!("\n=== Destinations ===");
        let last = per_destination.len() - 1;
        for (i, (destination, batches)) in per_destination.iter().enumerate() {
            let prefix = if i == last { "└─" } else { "├─" };
            println!("   {} {}: {} batches", prefix, destination, batches);
        }
    }

    if let Some(telemetry) = &outcome.telemetry {
        println!("\n=== Telemetry ===");
        println!("   ├─ Points sent: {}", telemetry.sent);
        println!("   ├─ Points failed: {}", telemetry.failed);
        println!("   └─ Points dropped: {}", telemetry.dropped);
    }

    println!();
}
