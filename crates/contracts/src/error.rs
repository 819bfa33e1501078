//! Layered error definitions
//!
//! Categorized by source: config / input / sink / telemetry / report

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Input Errors =====
    /// Malformed record in the input stream
    #[error("input format error in '{source_name}': {message}")]
    InputFormat {
        source_name: String,
        message: String,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== Side Channel Errors =====
    /// Telemetry transmission error
    #[error("telemetry collector '{collector}' error: {message}")]
    Telemetry { collector: String, message: String },

    /// Result report error
    #[error("result report to '{destination}' failed: {message}")]
    Report {
        destination: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create input format error
    pub fn input_format(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputFormat {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create telemetry error
    pub fn telemetry(collector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Telemetry {
            collector: collector.into(),
            message: message.into(),
        }
    }

    /// Create result report error
    pub fn report(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Report {
            destination: destination.into(),
            message: message.into(),
        }
    }
}
