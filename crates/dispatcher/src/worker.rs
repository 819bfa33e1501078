//! Worker - pulls batches from the shared queue and delivers them to one sink

use std::sync::Arc;

use contracts::{BatchSink, FieldValue, TelemetryPoint};
use ingestion::{Batch, BatchReceiver, BufferPool};
use observability::{
    record_batch_delivered, record_batch_discarded, record_delivery_failure, RunningStats,
    TelemetryHandle,
};
use tracing::{debug, error, instrument};

use crate::compress;
use crate::error::DispatcherError;
use crate::metrics::PoolMetrics;

/// Measurement name of per-request telemetry points
pub const WRITE_MEASUREMENT: &str = "benchmark_write";

/// Per-worker delivery behaviour
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    /// When false, batches are recycled without being delivered
    pub do_load: bool,
    /// Gzip payloads before delivery
    pub gzip: bool,
    /// Gzip level, 0-9
    pub gzip_level: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            do_load: true,
            gzip: true,
            gzip_level: 6,
        }
    }
}

impl From<&contracts::LoadConfig> for WorkerSettings {
    fn from(config: &contracts::LoadConfig) -> Self {
        Self {
            do_load: config.do_load,
            gzip: config.gzip,
            gzip_level: config.gzip_level,
        }
    }
}

/// What one worker did over its lifetime
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub sink: String,
    pub destination: String,
    /// Batches delivered
    pub batches: u64,
    /// Batches recycled without delivery
    pub discarded: u64,
    pub items: u64,
    /// Uncompressed payload bytes
    pub raw_bytes: u64,
    /// Request body bytes handed to the sink
    pub body_bytes: u64,
    /// Bytes the sink reported as written
    pub bytes_written: u64,
    /// Request body size distribution
    pub body_size: RunningStats,
}

pub(crate) struct Worker<S> {
    pub(crate) id: usize,
    pub(crate) sink: S,
    pub(crate) queue: BatchReceiver,
    pub(crate) buffers: Arc<BufferPool>,
    pub(crate) settings: WorkerSettings,
    pub(crate) telemetry: Option<TelemetryHandle>,
    pub(crate) metrics: Arc<PoolMetrics>,
}

impl<S: BatchSink> Worker<S> {
    /// Worker loop
    ///
    /// Runs until the queue is closed and drained. The first delivery
    /// error ends the loop and is returned to the pool.
    #[instrument(
        name = "worker_loop",
        skip(self),
        fields(worker = self.id, sink = %self.sink.name())
    )]
    pub(crate) async fn run(mut self) -> Result<WorkerReport, DispatcherError> {
        let mut report = WorkerReport {
            worker_id: self.id,
            sink: self.sink.name().to_string(),
            destination: self.sink.destination().to_string(),
            ..Default::default()
        };

        debug!(worker = self.id, dst = %report.destination, "Worker started");

        while let Some(batch) = self.queue.next().await {
            if !self.settings.do_load {
                report.discarded += 1;
                self.metrics.inc_discarded();
                record_batch_discarded();
                self.buffers.release(batch.into_buffer());
                continue;
            }

            self.deliver(batch, &mut report).await?;
        }

        // Buffered sinks surface write errors here; the batches are lost.
        if let Err(source) = self.sink.close().await {
            self.metrics.inc_failures();
            record_delivery_failure(self.sink.destination());
            error!(worker = self.id, error = %source, "Close failed after last batch");
            return Err(DispatcherError::Close {
                worker: self.id,
                sink: self.sink.name().to_string(),
                source,
            });
        }

        debug!(
            worker = self.id,
            batches = report.batches,
            items = report.items,
            "Worker stopped"
        );
        Ok(report)
    }

    async fn deliver(
        &mut self,
        batch: Batch,
        report: &mut WorkerReport,
    ) -> Result<(), DispatcherError> {
        let seq = batch.seq;
        let items = batch.items;
        let raw_len = batch.len();

        let (batch, body) = if self.settings.gzip {
            let scratch = self.buffers.acquire();
            let (batch, body) = compress::gzip_batch(batch, self.settings.gzip_level, scratch)
                .await
                .map_err(|source| DispatcherError::Compression {
                    worker: self.id,
                    source,
                })?;
            (batch, Some(body))
        } else {
            (batch, None)
        };

        let compressed = body.is_some();
        let payload: &[u8] = body.as_deref().unwrap_or(batch.as_bytes());
        let body_len = payload.len();
        let result = self.sink.deliver(payload, compressed).await;

        self.buffers.release(batch.into_buffer());
        if let Some(body) = body {
            self.buffers.release(body);
        }

        let written = match result {
            Ok(written) => written,
            Err(source) => {
                self.metrics.inc_failures();
                record_delivery_failure(self.sink.destination());
                error!(
                    worker = self.id,
                    batch = seq,
                    bytes = body_len,
                    error = %source,
                    "Delivery failed"
                );
                return Err(DispatcherError::Delivery {
                    worker: self.id,
                    sink: self.sink.name().to_string(),
                    seq,
                    source,
                });
            }
        };

        report.batches += 1;
        report.items += items as u64;
        report.raw_bytes += raw_len as u64;
        report.body_bytes += body_len as u64;
        report.bytes_written += written as u64;
        report.body_size.push(body_len as f64);

        self.metrics.record_delivery(items, raw_len, body_len);
        record_batch_delivered(self.sink.destination(), body_len, compressed);
        self.emit_telemetry(report.batches, compressed, body_len);

        Ok(())
    }

    fn emit_telemetry(&self, request_num: u64, compressed: bool, body_bytes: usize) {
        let Some(telemetry) = &self.telemetry else {
            return;
        };

        let timestamp_ns = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();

        let point = TelemetryPoint::new(WRITE_MEASUREMENT, timestamp_ns)
            .with_tag("src_addr", telemetry.hostname())
            .with_tag("dst_addr", self.sink.destination())
            .with_tag("worker_id", self.id.to_string())
            .with_field("worker_req_num", FieldValue::Int(request_num as i64))
            .with_field("gzip", FieldValue::Bool(compressed))
            .with_field("body_bytes", FieldValue::Int(body_bytes as i64));

        telemetry.emit(point);
    }
}
