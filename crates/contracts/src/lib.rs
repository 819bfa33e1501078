//! # Contracts
//!
//! Frozen interface contracts between the loader crates: port traits,
//! shared data structures and the unified error type.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Ports
//! - [`ItemSource`]: sequential record reader feeding the scanner
//! - [`BatchSink`]: one delivery endpoint per worker
//! - [`TelemetryCollector`]: best-effort receiver of telemetry points
//! - [`ResultReporter`]: receiver of the end-of-run load report

mod config;
mod error;
mod report;
mod sink;
mod source;
mod stats;
mod telemetry;

pub use config::*;
pub use error::*;
pub use report::*;
pub use sink::*;
pub use source::*;
pub use stats::*;
pub use telemetry::*;
