//! LoadReport and ResultReporter - end-of-run result record

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ContractError;

/// Structured result of one completed load, derived from `RunStats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Target store label
    pub db_type: String,
    /// Host that ran the load
    pub hostname: String,
    /// Comma separated delivery targets
    pub destination: String,
    pub workers: usize,
    pub batch_size: usize,
    /// -1 = unlimited
    pub item_limit: i64,
    pub gzip: bool,
    /// Extra tags
    pub tags: BTreeMap<String, String>,
    /// Items read
    pub items: u64,
    pub items_rate: f64,
    pub values_rate: f64,
    pub bytes_rate: f64,
    /// Wall-clock duration in seconds
    pub duration_secs: f64,
}

/// Result reporter trait
///
/// A failed report is fatal for the operator but does not invalidate the load.
#[trait_variant::make(ResultReporter: Send)]
pub trait LocalResultReporter {
    /// Report destination label
    fn destination(&self) -> &str;

    /// Send the report
    async fn report(&mut self, report: &LoadReport) -> Result<(), ContractError>;
}
