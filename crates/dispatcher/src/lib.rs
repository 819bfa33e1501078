//! # Dispatcher
//!
//! 批次投递模块。
//!
//! 负责：
//! - 从有界队列消费 `Batch`
//! - 按需 gzip 压缩，投递到 sink (HTTP / 文件 / 日志)
//! - 首个投递错误即终止整个 worker pool

pub mod compress;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod sinks;
mod worker;

pub use contracts::BatchSink;
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, PoolMetrics};
pub use pool::{assign_targets, PoolReport, WorkerPool};
pub use sinks::{FileSink, FileSinkConfig, HttpSink, HttpSinkConfig, LogSink};
pub use worker::{WorkerReport, WorkerSettings, WRITE_MEASUREMENT};
