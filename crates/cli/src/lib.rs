//! # Bulk Loader
//!
//! 批量加载管道的库入口，供 `bulkload` 二进制与集成测试共用。
//!
//! - [`pipeline::Pipeline`]: 编排 Scanner、有界队列、Worker Pool 与 Telemetry
//! - [`pipeline::RunAccountant`]: 计算 `RunStats` 与吞吐率
//! - [`report::InfluxReporter`]: 运行结束后写出 `load_benchmarks` 记录

pub mod error;
pub mod pipeline;
pub mod report;

pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineConfig, RunAccountant, RunOutcome};
pub use report::{report_point, InfluxReporter, REPORT_MEASUREMENT};
