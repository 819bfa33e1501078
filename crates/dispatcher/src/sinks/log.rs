//! LogSink - logs batch summaries via tracing

use contracts::{BatchSink, ContractError};
use tracing::{info, instrument};

/// Sink that only logs what it would have sent
pub struct LogSink {
    name: String,
    batches: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: 0,
        }
    }

    /// Batches seen so far
    pub fn batches(&self) -> u64 {
        self.batches
    }
}

impl BatchSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn destination(&self) -> &str {
        "log"
    }

    #[instrument(
        name = "log_sink_deliver",
        skip(self, payload),
        fields(sink = %self.name)
    )]
    async fn deliver(&mut self, payload: &[u8], compressed: bool) -> Result<usize, ContractError> {
        self.batches += 1;
        info!(
            sink = %self.name,
            batch = self.batches,
            bytes = payload.len(),
            compressed,
            "Batch received"
        );
        Ok(payload.len())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, batches = self.batches, "LogSink closed");
        Ok(())
    }
}
