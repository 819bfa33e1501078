//! ItemSource trait - sequential record reader
//!
//! Decouples the scanner from where records come from (stdin, file, memory).

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Dataset size announced in-band by an upstream generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatasetSize {
    /// Expected number of items
    pub items: u64,
    /// Expected number of field values
    pub values: u64,
}

/// Sequential record source
///
/// A record is one input line without its terminator. The returned slice
/// borrows the source's internal buffer and is only valid until the next call,
/// so reading never allocates per record.
pub trait ItemSource: Send {
    /// Source name (used for logging and errors)
    fn name(&self) -> &str;

    /// Read the next record
    ///
    /// Returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    /// Malformed records or read failures; both are fatal to the run.
    fn next_record(&mut self) -> Result<Option<&[u8]>, ContractError>;

    /// Expected totals, if the stream announced them so far
    fn dataset_size(&self) -> Option<DatasetSize>;
}
