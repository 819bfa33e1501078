//! BatchSink trait - delivery endpoint interface
//!
//! One sink instance is owned by exactly one worker for its lifetime.

use crate::ContractError;

/// Batch delivery trait
///
/// All delivery endpoints (HTTP, file, log, test doubles) implement this trait.
#[trait_variant::make(BatchSink: Send)]
pub trait LocalBatchSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Destination label reported in telemetry (URL, path, ...)
    fn destination(&self) -> &str;

    /// Deliver one batch payload
    ///
    /// `compressed` tells the sink the payload is gzip encoded.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    /// Any error is fatal for the whole run; sinks must not retry silently.
    async fn deliver(&mut self, payload: &[u8], compressed: bool) -> Result<usize, ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
