//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// No delivery target configured
    #[error("no delivery target configured")]
    NoTargets,

    /// A sink rejected a batch; fatal for the run
    #[error("worker {worker} failed to deliver batch {seq} to '{sink}': {source}")]
    Delivery {
        worker: usize,
        sink: String,
        seq: u64,
        #[source]
        source: contracts::ContractError,
    },

    /// A sink failed to flush or close after its last batch
    #[error("worker {worker} failed to close '{sink}': {source}")]
    Close {
        worker: usize,
        sink: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Payload compression failed
    #[error("worker {worker} failed to compress batch: {source}")]
    Compression {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    /// Worker task panicked or was cancelled
    #[error("worker task aborted: {message}")]
    WorkerAborted { message: String },
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from a sink rejecting or losing a batch
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery { .. } | Self::Close { .. })
    }
}
