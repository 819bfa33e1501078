//! Pipeline orchestrator - coordinates all components.
//!
//! Source -> Scanner (blocking thread) -> bounded queue -> WorkerPool -> sinks,
//! with workers feeding the telemetry side channel. The first fatal error
//! from the scanner or any worker ends the run.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    BatchSink, ItemSource, LoadConfig, LoaderConfig, ReportConfig, ResultReporter, RunStats,
    TargetConfig, TelemetryConfig,
};
use dispatcher::{DispatcherError, LogSink, PoolMetrics, PoolReport, WorkerPool, WorkerSettings};
use ingestion::{
    batch_queue, BatchSender, BufferPool, PoolStats, ScanConfig, ScanStats, Scanner,
};
use observability::{
    spawn_telemetry, InfluxCollector, InfluxWriter, TelemetryCollectors, TelemetryHandle,
    TelemetrySettings, TelemetryStats, TelemetryTask,
};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use super::RunAccountant;
use crate::error::{PipelineError, Result};

/// Pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub load: LoadConfig,
    pub targets: Vec<TargetConfig>,
    pub telemetry: TelemetryConfig,
    pub report: Option<ReportConfig>,
    /// Log delivery progress at this interval (None = disabled)
    pub progress_interval: Option<Duration>,
}

impl From<LoaderConfig> for PipelineConfig {
    fn from(config: LoaderConfig) -> Self {
        Self {
            load: config.load,
            targets: config.targets,
            telemetry: config.telemetry,
            report: config.report,
            progress_interval: None,
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stats: RunStats,
    pub scan: ScanStats,
    pub pool: PoolReport,
    pub buffers: PoolStats,
    /// None when telemetry is disabled
    pub telemetry: Option<TelemetryStats>,
}

/// Queue, buffers, telemetry and an (initially empty) worker pool
///
/// Add sinks through [`LoadSession::pool_mut`], then hand the session to
/// [`Pipeline::execute`].
pub struct LoadSession {
    pool: WorkerPool,
    queue: BatchSender,
    buffers: Arc<BufferPool>,
    telemetry: Option<TelemetryTask>,
}

impl LoadSession {
    pub fn pool_mut(&mut self) -> &mut WorkerPool {
        &mut self.pool
    }

    pub fn buffers(&self) -> &Arc<BufferPool> {
        &self.buffers
    }

    /// Tear down without running
    pub async fn abandon(self) {
        self.queue.close();
        if let Some(task) = self.telemetry {
            task.shutdown().await;
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    hostname: String,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            hostname: local_hostname(),
        }
    }

    /// Override the host name used for telemetry and reports
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Run the pipeline against the configured targets
    ///
    /// With loading disabled and no targets, workers get log-only sinks.
    #[instrument(
        name = "pipeline_run",
        skip(self, source),
        fields(workers = self.config.load.workers)
    )]
    pub async fn run<S: ItemSource + 'static>(&self, source: S) -> Result<RunOutcome> {
        let mut session = self.session()?;
        let workers = self.config.load.workers.max(1);

        let spawned = if self.config.targets.is_empty() && !self.config.load.do_load {
            for i in 0..workers {
                session.pool_mut().spawn(LogSink::new(format!("scan-only-{i}")));
            }
            Ok(())
        } else {
            session
                .pool_mut()
                .spawn_targets(&self.config.targets, workers)
                .await
        };

        if let Err(e) = spawned {
            session.abandon().await;
            return Err(e.into());
        }

        self.execute(session, source).await
    }

    /// Run the pipeline with one worker per given sink
    pub async fn run_with_sinks<S, K>(&self, source: S, sinks: Vec<K>) -> Result<RunOutcome>
    where
        S: ItemSource + 'static,
        K: BatchSink + 'static,
    {
        let mut session = self.session()?;
        for sink in sinks {
            session.pool_mut().spawn(sink);
        }
        self.execute(session, source).await
    }

    /// Build queue, buffer pool, telemetry and an empty worker pool
    pub fn session(&self) -> Result<LoadSession> {
        let load = &self.config.load;
        let buffers = Arc::new(BufferPool::new(load.buffer_capacity));
        let (queue, receiver) = batch_queue(load.queue_capacity());

        let mut pool =
            WorkerPool::new(WorkerSettings::from(load), receiver, Arc::clone(&buffers));
        let telemetry = match self.start_telemetry()? {
            Some((handle, task)) => {
                pool = pool.with_telemetry(handle);
                Some(task)
            }
            None => None,
        };

        Ok(LoadSession {
            pool,
            queue,
            buffers,
            telemetry,
        })
    }

    /// Scan `source` through the session's worker pool until done or failed
    pub async fn execute<S: ItemSource + 'static>(
        &self,
        session: LoadSession,
        source: S,
    ) -> Result<RunOutcome> {
        let LoadSession {
            pool,
            queue,
            buffers,
            telemetry,
        } = session;

        let result = self.drive(source, pool, queue, Arc::clone(&buffers)).await;

        let telemetry = match telemetry {
            Some(task) => Some(task.shutdown().await),
            None => None,
        };

        let (scan, pool, stats) = result.inspect_err(|e| {
            error!(stage = e.stage(), error = %e, "Pipeline failed");
        })?;

        info!(
            items = stats.items,
            batches = stats.batches,
            duration_secs = stats.duration.as_secs_f64(),
            "Pipeline finished"
        );

        Ok(RunOutcome {
            stats,
            scan,
            pool,
            buffers: buffers.stats(),
            telemetry,
        })
    }

    async fn drive<S: ItemSource + 'static>(
        &self,
        source: S,
        pool: WorkerPool,
        queue: BatchSender,
        buffers: Arc<BufferPool>,
    ) -> Result<(ScanStats, PoolReport, RunStats)> {
        if pool.is_empty() {
            queue.close();
            return Err(DispatcherError::NoTargets.into());
        }

        let accountant = RunAccountant::start(pool.len());
        let progress = self
            .config
            .progress_interval
            .map(|every| spawn_progress(pool.metrics(), every));

        info!(
            workers = pool.len(),
            batch_size = self.config.load.batch_size,
            gzip = self.config.load.gzip,
            do_load = self.config.load.do_load,
            "Starting load"
        );

        let scanner = Scanner::new(source, ScanConfig::from(&self.config.load), buffers);
        let mut scan = tokio::task::spawn_blocking(move || scanner.run(queue));
        let joined = pool.join();
        tokio::pin!(joined);

        let first = tokio::select! {
            scanned = &mut scan => Finished::Scanner(flatten(scanned)),
            report = &mut joined => Finished::Workers(report),
        };

        // Whichever side fails first ends the run; dropping the pool future
        // cancels the remaining workers. A failed pool has closed the queue,
        // so the scanner thread stops before its next record; it is not
        // awaited because a read blocked on the source cannot be cancelled.
        let outcome = match first {
            Finished::Scanner(Ok(scan_stats)) => joined
                .as_mut()
                .await
                .map(|report| (scan_stats, report))
                .map_err(PipelineError::from),
            Finished::Scanner(Err(e)) => Err(e),
            Finished::Workers(Ok(report)) => {
                flatten(scan.await).map(|scan_stats| (scan_stats, report))
            }
            Finished::Workers(Err(e)) => Err(e.into()),
        };

        if let Some(progress) = progress {
            progress.abort();
        }

        let (scan_stats, report) = outcome?;
        let stats = accountant.finish(&scan_stats);
        Ok((scan_stats, report, stats))
    }

    /// Send the end-of-run record
    ///
    /// A failure here is reported as a reporting error: the load itself completed.
    #[instrument(name = "pipeline_report", skip_all, fields(destination = %reporter.destination()))]
    pub async fn report<R: ResultReporter>(
        &self,
        reporter: &mut R,
        report_config: &ReportConfig,
        stats: &RunStats,
    ) -> Result<()> {
        let record = RunAccountant::load_report(
            stats,
            &self.config.load,
            &self.config.targets,
            report_config,
            &self.hostname,
        );

        reporter
            .report(&record)
            .await
            .map_err(|e| PipelineError::report(reporter.destination(), e))?;

        info!(destination = %reporter.destination(), "Result report sent");
        Ok(())
    }

    fn start_telemetry(&self) -> Result<Option<(TelemetryHandle, TelemetryTask)>> {
        let config = &self.config.telemetry;
        if !config.enabled {
            return Ok(None);
        }

        let mut collectors = TelemetryCollectors::new();
        if let Some(host) = &config.host {
            let mut writer = InfluxWriter::new(host, config.database.as_str())
                .map_err(|e| PipelineError::telemetry(format!("{e:#}")))?;
            if let Some(auth) = &config.basic_auth {
                writer = writer.with_basic_auth_pair(auth);
            }
            collectors = collectors.with_influx(InfluxCollector::new(writer));
        }
        if config.stderr {
            collectors = collectors.with_stderr();
        }

        if collectors.is_empty() {
            warn!("Telemetry enabled without a host or stderr output, disabling");
            return Ok(None);
        }

        Ok(Some(spawn_telemetry(
            collectors,
            TelemetrySettings::from(config),
            self.hostname.as_str(),
        )))
    }
}

enum Finished {
    Scanner(Result<ScanStats>),
    Workers(std::result::Result<PoolReport, DispatcherError>),
}

fn flatten(
    joined: std::result::Result<ingestion::Result<ScanStats>, tokio::task::JoinError>,
) -> Result<ScanStats> {
    match joined {
        Ok(scanned) => scanned.map_err(PipelineError::from),
        Err(e) => Err(PipelineError::task(format!("scanner: {e}"))),
    }
}

fn spawn_progress(metrics: Arc<PoolMetrics>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshot = metrics.snapshot();
            info!(
                batches = snapshot.delivered,
                items = snapshot.items,
                body_bytes = snapshot.body_bytes,
                discarded = snapshot.discarded,
                "Load progress"
            );
        }
    })
}

/// Local host name, used as `src_addr` and in result reports
pub(crate) fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
