//! Sink implementations
//!
//! Contains HttpSink, FileSink, and LogSink.

mod file;
mod http;
mod log;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::http::{HttpSink, HttpSinkConfig};
pub use self::log::LogSink;
