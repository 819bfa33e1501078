//! # Ingestion
//!
//! Input side of the bulk loading pipeline.
//!
//! Responsibilities:
//! - Read records from an `ItemSource` (stdin, file, memory)
//! - Assemble items into size-bounded batches in pooled buffers
//! - Hand batches to workers through a bounded queue (backpressure)
//! - Validate item accounting once the stream is exhausted
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{batch_queue, BufferPool, LineSource, ScanConfig, Scanner};
//!
//! let pool = Arc::new(BufferPool::new(4 * 1024 * 1024));
//! let (tx, rx) = batch_queue(workers);
//! let scanner = Scanner::new(LineSource::stdin(), ScanConfig::default(), pool.clone());
//!
//! let scan = tokio::task::spawn_blocking(move || scanner.run(tx));
//! while let Some(batch) = rx.next().await {
//!     // deliver, then pool.release(batch.into_buffer())
//! }
//! ```

mod error;
mod pool;
mod queue;
mod scanner;
mod source;

// Re-exports
pub use error::{IngestionError, Result};
pub use pool::{BufferPool, PoolStats};
pub use queue::{batch_queue, Batch, BatchReceiver, BatchSender};
pub use scanner::{ScanConfig, ScanStats, Scanner};
pub use source::{parse_dataset_size, LineSource, DATASET_SIZE_MARKER};
