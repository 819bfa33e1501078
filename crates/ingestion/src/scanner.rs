//! Stream scanner - assembles items into batches and feeds the batch queue

use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use contracts::{DatasetSize, ItemSource};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::pool::BufferPool;
use crate::queue::{Batch, BatchSender};

/// Scanner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Items per batch (>= 1)
    pub batch_size: usize,
    /// Lines per item (>= 1)
    pub lines_per_item: usize,
    /// Stop after this many items (None = unlimited)
    pub item_limit: Option<u64>,
    /// A stream without a dataset size marker is an error
    pub require_dataset_size: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 5000,
            lines_per_item: 2,
            item_limit: None,
            require_dataset_size: true,
        }
    }
}

impl From<&contracts::LoadConfig> for ScanConfig {
    fn from(config: &contracts::LoadConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            lines_per_item: config.lines_per_item.max(1),
            item_limit: config.item_limit(),
            require_dataset_size: config.require_dataset_size,
        }
    }
}

/// Scanner counters, final once `Scanner::run` returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Item lines read (dataset size marker excluded)
    pub lines: u64,
    /// Complete items read
    pub items: u64,
    /// Bytes submitted to the queue
    pub bytes: u64,
    /// Values announced by the dataset (0 if unknown)
    pub values: u64,
    /// Batches submitted to the queue
    pub batches: u64,
    /// Scanning stopped because the item limit was reached
    pub limit_reached: bool,
    /// Dataset size reported by the source
    pub expected: Option<DatasetSize>,
}

/// Stream scanner
///
/// Reads records one at a time, cuts a batch whenever it holds
/// `batch_size` items or the item limit is hit, and submits it to the queue.
/// Runs on a blocking thread: submission blocks while the queue is full.
pub struct Scanner<S> {
    source: S,
    config: ScanConfig,
    pool: Arc<BufferPool>,
}

impl<S: ItemSource> Scanner<S> {
    pub fn new(source: S, config: ScanConfig, pool: Arc<BufferPool>) -> Self {
        Self {
            source,
            config,
            pool,
        }
    }

    /// Scan the whole source
    ///
    /// The queue is closed exactly once, after the last batch (including a
    /// trailing partial one) was submitted, whether or not scanning succeeded.
    ///
    /// # Errors
    /// - Source read/format failure
    /// - Line count not a multiple of `lines_per_item`
    /// - Item count differs from the dataset size, or the size is missing
    ///   (unless the item limit was hit)
    /// - Queue closed by the consumers
    #[instrument(
        name = "scanner_run",
        skip(self, queue),
        fields(source = %self.source.name(), batch_size = self.config.batch_size)
    )]
    pub fn run(mut self, queue: BatchSender) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        let mut buf = self.pool.acquire();

        let scanned = self.scan(&queue, &mut buf, &mut stats);

        // Done: no more batches will be submitted.
        queue.close();
        self.pool.release(buf);
        scanned?;

        info!(
            lines = stats.lines,
            items = stats.items,
            batches = stats.batches,
            bytes = stats.bytes,
            limit_reached = stats.limit_reached,
            "scanner done"
        );

        self.verify(&mut stats)?;
        Ok(stats)
    }

    fn scan(
        &mut self,
        queue: &BatchSender,
        buf: &mut BytesMut,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let lines_per_item = self.config.lines_per_item as u64;
        let mut items_this_batch = 0usize;

        loop {
            if self.limit_reached(stats.items) {
                stats.limit_reached = true;
                debug!(items = stats.items, "item limit reached");
                break;
            }

            // Workers gone: stop before reading further input.
            if queue.is_closed() {
                return Err(IngestionError::QueueClosed);
            }

            let Some(record) = self.source.next_record()? else {
                break;
            };

            stats.lines += 1;
            buf.extend_from_slice(record);
            buf.put_u8(b'\n');

            if stats.lines % lines_per_item != 0 {
                continue;
            }

            stats.items += 1;
            items_this_batch += 1;

            if items_this_batch == self.config.batch_size || self.limit_reached(stats.items) {
                self.submit(queue, buf, items_this_batch, stats)?;
                items_this_batch = 0;
            }
        }

        // Input ended mid-batch: the partial batch still goes out.
        if items_this_batch > 0 {
            self.submit(queue, buf, items_this_batch, stats)?;
        }

        Ok(())
    }

    fn limit_reached(&self, items: u64) -> bool {
        self.config.item_limit.is_some_and(|limit| items >= limit)
    }

    fn submit(
        &self,
        queue: &BatchSender,
        buf: &mut BytesMut,
        items: usize,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let full = std::mem::replace(buf, self.pool.acquire());
        let len = full.len() as u64;
        let batch = Batch::new(stats.batches, items, full);

        queue.submit_blocking(batch)?;

        stats.batches += 1;
        stats.bytes += len;
        counter!("bulkload_batches_scanned_total").increment(1);
        counter!("bulkload_bytes_scanned_total").increment(len);
        Ok(())
    }

    fn verify(&self, stats: &mut ScanStats) -> Result<()> {
        let lines_per_item = self.config.lines_per_item;
        if stats.lines % lines_per_item as u64 != 0 {
            return Err(IngestionError::LineCountMismatch {
                lines: stats.lines,
                lines_per_item,
            });
        }

        stats.expected = self.source.dataset_size();
        stats.values = stats.expected.map_or(0, |size| size.values);

        match stats.expected {
            _ if stats.limit_reached => {
                debug!("item limit reached, skipping dataset size check");
            }
            Some(expected) if expected.items != stats.items => {
                return Err(IngestionError::ItemCountMismatch {
                    actual: stats.items,
                    expected: expected.items,
                });
            }
            Some(_) => {}
            None if stats.items == 0 => {}
            None if self.config.require_dataset_size => {
                return Err(IngestionError::MissingDatasetSize { items: stats.items });
            }
            None => {
                warn!(
                    items = stats.items,
                    "stream carried no dataset size, skipping item count check"
                );
            }
        }

        Ok(())
    }
}
