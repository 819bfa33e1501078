//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{LoadSession, Pipeline, PipelineConfig, RunOutcome};
pub use stats::{destination_label, print_details, RunAccountant};
