//! End-of-run result reporting
//!
//! One `load_benchmarks` point per completed load, written to the report
//! host in line protocol.

use contracts::{
    ContractError, FieldValue, LoadReport, ReportConfig, ResultReporter, TelemetryPoint,
};
use observability::line_protocol::encode_points;
use observability::InfluxWriter;
use tracing::debug;

/// Measurement name of the result record
pub const REPORT_MEASUREMENT: &str = "load_benchmarks";

/// Convert a load report into a line-protocol point
pub fn report_point(report: &LoadReport, timestamp_ns: i64) -> TelemetryPoint {
    let mut point = TelemetryPoint::new(REPORT_MEASUREMENT, timestamp_ns)
        .with_tag("db_type", &report.db_type)
        .with_tag("hostname", &report.hostname)
        .with_tag("destination", &report.destination)
        .with_tag("workers", report.workers.to_string())
        .with_tag("batch_size", report.batch_size.to_string())
        .with_tag("item_limit", report.item_limit.to_string())
        .with_tag("gzip", report.gzip.to_string());

    for (key, value) in &report.tags {
        point = point.with_tag(key, value);
    }

    point
        .with_field("items", FieldValue::Int(report.items as i64))
        .with_field("items_rate", FieldValue::Float(report.items_rate))
        .with_field("values_rate", FieldValue::Float(report.values_rate))
        .with_field("bytes_rate", FieldValue::Float(report.bytes_rate))
        .with_field("duration_secs", FieldValue::Float(report.duration_secs))
}

/// Writes the result record to an InfluxDB-compatible host
pub struct InfluxReporter {
    writer: InfluxWriter,
    destination: String,
}

impl InfluxReporter {
    pub fn new(writer: InfluxWriter) -> Self {
        let destination = writer.write_url().to_string();
        Self {
            writer,
            destination,
        }
    }

    /// Build from the `[report]` table
    pub fn from_config(config: &ReportConfig) -> Result<Self, ContractError> {
        let mut writer = InfluxWriter::new(&config.host, config.database.as_str())
            .map_err(|e| ContractError::report(&config.host, format!("{e:#}")))?;
        if let Some(user) = &config.user {
            writer = writer.with_basic_auth(user, config.password.clone());
        }
        Ok(Self::new(writer))
    }
}

impl ResultReporter for InfluxReporter {
    fn destination(&self) -> &str {
        &self.destination
    }

    async fn report(&mut self, report: &LoadReport) -> Result<(), ContractError> {
        let timestamp_ns = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        let body = encode_points(&[report_point(report, timestamp_ns)]);
        debug!(destination = %self.destination, bytes = body.len(), "Sending result report");

        self.writer
            .write(body)
            .await
            .map_err(|e| ContractError::report(&self.destination, format!("{e:#}")))
    }
}
