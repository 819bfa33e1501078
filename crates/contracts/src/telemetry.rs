//! TelemetryPoint and TelemetryCollector - observability side channel contract

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Field value of a telemetry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// One timestamped observability record (tags + fields)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Measurement name
    pub measurement: String,
    /// Unix timestamp in nanoseconds
    pub timestamp_ns: i64,
    /// Tags, in insertion order
    pub tags: Vec<(String, String)>,
    /// Fields, in insertion order
    pub fields: Vec<(String, FieldValue)>,
}

impl TelemetryPoint {
    /// Create an empty point
    pub fn new(measurement: impl Into<String>, timestamp_ns: i64) -> Self {
        Self {
            measurement: measurement.into(),
            timestamp_ns,
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    /// Look up a tag value
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a field value
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Telemetry collector trait
///
/// Transmission is best-effort: callers log errors and carry on.
#[trait_variant::make(TelemetryCollector: Send)]
pub trait LocalTelemetryCollector {
    /// Collector name (used for logging)
    fn name(&self) -> &str;

    /// Send one batch of points
    async fn send(&mut self, points: &[TelemetryPoint]) -> Result<(), ContractError>;
}
