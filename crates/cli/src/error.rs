//! Error types for pipeline runs.

use contracts::ContractError;
use dispatcher::DispatcherError;
use ingestion::IngestionError;
use thiserror::Error;

/// Fatal pipeline failure, tagged with the stage that failed
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source read, malformed input or count mismatch
    #[error("scan failed: {0}")]
    Scan(#[from] IngestionError),

    /// Sink creation or batch delivery failure
    #[error("delivery failed: {0}")]
    Dispatch(#[from] DispatcherError),

    /// Telemetry collector could not be set up
    #[error("telemetry setup failed: {message}")]
    Telemetry { message: String },

    /// The load completed, the result report did not
    #[error("load completed but reporting to '{destination}' failed: {source}")]
    Report {
        destination: String,
        #[source]
        source: ContractError,
    },

    /// A pipeline task panicked
    #[error("pipeline task failed: {message}")]
    Task { message: String },
}

impl PipelineError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }

    pub fn report(destination: impl Into<String>, source: ContractError) -> Self {
        Self::Report {
            destination: destination.into(),
            source,
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    /// Pipeline stage the error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Scan(_) => "scan",
            Self::Dispatch(_) => "delivery",
            Self::Telemetry { .. } => "telemetry",
            Self::Report { .. } => "report",
            Self::Task { .. } => "pipeline",
        }
    }

    /// Whether the load itself failed (as opposed to post-load reporting)
    pub fn is_load_failure(&self) -> bool {
        !matches!(self, Self::Report { .. })
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        let scan = PipelineError::from(IngestionError::ItemCountMismatch {
            actual: 4,
            expected: 5,
        });
        assert_eq!(scan.stage(), "scan");
        assert!(scan.is_load_failure());

        let report = PipelineError::report(
            "http://influx:8086",
            ContractError::report("http://influx:8086", "503"),
        );
        assert_eq!(report.stage(), "report");
        assert!(!report.is_load_failure());
        assert!(report.to_string().starts_with("load completed"));

        let delivery = PipelineError::from(DispatcherError::NoTargets);
        assert_eq!(delivery.stage(), "delivery");
    }
}
