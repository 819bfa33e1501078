//! WorkerPool - fixed set of workers draining the batch queue
//!
//! Each worker owns one sink. Targets are assigned round-robin, so worker
//! `i` talks to `targets[i % targets.len()]`. The first worker error
//! closes the queue and cancels every other worker.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use contracts::{BatchSink, SinkType, TargetConfig};
use ingestion::{BatchReceiver, BufferPool};
use observability::{RunningStats, TelemetryHandle};
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use crate::error::DispatcherError;
use crate::metrics::PoolMetrics;
use crate::sinks::{FileSink, FileSinkConfig, HttpSink, LogSink};
use crate::worker::{Worker, WorkerReport, WorkerSettings};

/// Pick a target for each worker, round-robin
pub fn assign_targets(workers: usize, targets: &[TargetConfig]) -> Vec<&TargetConfig> {
    if targets.is_empty() {
        return Vec::new();
    }
    (0..workers).map(|i| &targets[i % targets.len()]).collect()
}

/// Empty every truncating file target once, before any worker opens it
///
/// Workers sharing a path each hold their own appending handle.
async fn truncate_file_targets(assigned: &[&TargetConfig]) -> Result<(), DispatcherError> {
    let mut done = HashSet::new();
    for target in assigned.iter().filter(|t| t.sink_type == SinkType::File) {
        let config = FileSinkConfig::from_params(&target.params)
            .map_err(|e| DispatcherError::sink_creation(&target.name, e))?;
        if config.truncate && done.insert(config.path.clone()) {
            FileSink::truncate(&config.path)
                .await
                .map_err(|e| DispatcherError::sink_creation(&target.name, e.to_string()))?;
        }
    }
    Ok(())
}

/// Running worker pool
pub struct WorkerPool {
    settings: WorkerSettings,
    queue: BatchReceiver,
    buffers: Arc<BufferPool>,
    telemetry: Option<TelemetryHandle>,
    metrics: Arc<PoolMetrics>,
    workers: JoinSet<Result<WorkerReport, DispatcherError>>,
    next_id: usize,
}

impl WorkerPool {
    /// Create an empty pool; add workers with [`WorkerPool::spawn`]
    pub fn new(settings: WorkerSettings, queue: BatchReceiver, buffers: Arc<BufferPool>) -> Self {
        Self {
            settings,
            queue,
            buffers,
            telemetry: None,
            metrics: Arc::new(PoolMetrics::new()),
            workers: JoinSet::new(),
            next_id: 0,
        }
    }

    /// Emit one telemetry point per delivered batch
    pub fn with_telemetry(mut self, telemetry: TelemetryHandle) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Spawn a worker that owns `sink`; returns its worker id
    pub fn spawn<S: BatchSink + 'static>(&mut self, sink: S) -> usize {
        let id = self.next_id;
        self.next_id += 1;

        let worker = Worker {
            id,
            sink,
            queue: self.queue.clone(),
            buffers: Arc::clone(&self.buffers),
            settings: self.settings,
            telemetry: self.telemetry.clone(),
            metrics: Arc::clone(&self.metrics),
        };
        self.workers.spawn(worker.run());
        id
    }

    /// Spawn `workers` workers with sinks built from `targets`, round-robin
    #[instrument(
        name = "worker_pool_spawn_targets",
        skip(self, targets),
        fields(targets = targets.len())
    )]
    pub async fn spawn_targets(
        &mut self,
        targets: &[TargetConfig],
        workers: usize,
    ) -> Result<(), DispatcherError> {
        if targets.is_empty() {
            return Err(DispatcherError::NoTargets);
        }

        let assigned = assign_targets(workers, targets);
        truncate_file_targets(&assigned).await?;
        for target in assigned {
            self.spawn_target(target).await?;
        }
        Ok(())
    }

    #[instrument(
        name = "worker_pool_spawn_target",
        skip(self, target),
        fields(sink = %target.name, sink_type = ?target.sink_type)
    )]
    async fn spawn_target(&mut self, target: &TargetConfig) -> Result<usize, DispatcherError> {
        let id = match target.sink_type {
            SinkType::Http => {
                let sink = HttpSink::from_params(&target.name, &target.params)
                    .map_err(|e| DispatcherError::sink_creation(&target.name, e.to_string()))?;
                self.spawn(sink)
            }
            SinkType::File => {
                let config = FileSinkConfig::from_params(&target.params)
                    .map_err(|e| DispatcherError::sink_creation(&target.name, e))?;
                // Truncation already happened once per path.
                let sink = FileSink::open(&target.name, config.appending())
                    .await
                    .map_err(|e| DispatcherError::sink_creation(&target.name, e.to_string()))?;
                self.spawn(sink)
            }
            SinkType::Log => self.spawn(LogSink::new(&target.name)),
        };
        Ok(id)
    }

    /// Number of workers spawned
    pub fn len(&self) -> usize {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    /// Shared live counters
    pub fn metrics(&self) -> Arc<PoolMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Wait for every worker to finish
    ///
    /// On the first failure the queue is closed, all other workers are
    /// cancelled and awaited, and the failure is returned.
    #[instrument(name = "worker_pool_join", skip(self), fields(workers = self.next_id))]
    pub async fn join(mut self) -> Result<PoolReport, DispatcherError> {
        let mut reports = Vec::with_capacity(self.next_id);

        while let Some(joined) = self.workers.join_next().await {
            let outcome = joined
                .map_err(|e| DispatcherError::WorkerAborted {
                    message: e.to_string(),
                })
                .and_then(|result| result);

            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(error = %e, "Worker failed, stopping pool");
                    self.queue.close();
                    self.workers.abort_all();
                    while self.workers.join_next().await.is_some() {}
                    return Err(e);
                }
            }
        }

        reports.sort_by_key(|r| r.worker_id);
        let report = PoolReport { workers: reports };

        info!(
            workers = report.workers.len(),
            batches = report.batches(),
            items = report.items(),
            body_bytes = report.body_bytes(),
            "Worker pool finished"
        );
        Ok(report)
    }
}

/// Aggregated per-worker results
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    /// Sorted by worker id
    pub workers: Vec<WorkerReport>,
}

impl PoolReport {
    pub fn batches(&self) -> u64 {
        self.workers.iter().map(|w| w.batches).sum()
    }

    pub fn discarded(&self) -> u64 {
        self.workers.iter().map(|w| w.discarded).sum()
    }

    pub fn items(&self) -> u64 {
        self.workers.iter().map(|w| w.items).sum()
    }

    pub fn raw_bytes(&self) -> u64 {
        self.workers.iter().map(|w| w.raw_bytes).sum()
    }

    pub fn body_bytes(&self) -> u64 {
        self.workers.iter().map(|w| w.body_bytes).sum()
    }

    /// Body size distribution across all workers
    pub fn body_size(&self) -> RunningStats {
        let mut stats = RunningStats::default();
        for worker in &self.workers {
            stats.merge(&worker.body_size);
        }
        stats
    }

    /// Delivered batches per destination
    pub fn batches_per_destination(&self) -> BTreeMap<String, u64> {
        let mut map = BTreeMap::new();
        for worker in &self.workers {
            *map.entry(worker.destination.clone()).or_insert(0) += worker.batches;
        }
        map
    }
}
