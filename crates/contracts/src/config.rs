//! LoaderConfig - config_loader output
//!
//! Describes a complete load run: pipeline sizing, telemetry side channel,
//! result reporting and delivery targets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use validator::Validate;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete loader configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoaderConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Pipeline sizing and behavior
    #[serde(default)]
    #[validate(nested)]
    pub load: LoadConfig,

    /// Telemetry side channel
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    /// End-of-run result report (None = no report)
    #[serde(default)]
    #[validate(nested)]
    pub report: Option<ReportConfig>,

    /// Delivery targets, assigned to workers round-robin
    #[serde(default)]
    #[validate(nested)]
    pub targets: Vec<TargetConfig>,
}

/// Pipeline sizing and behavior
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadConfig {
    /// Number of concurrent delivery workers
    #[serde(default = "default_workers")]
    #[validate(range(min = 1, message = "workers must be >= 1"))]
    pub workers: usize,

    /// Items per batch
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, message = "batch_size must be >= 1"))]
    pub batch_size: usize,

    /// Input lines that make up one item
    #[serde(default = "default_lines_per_item")]
    #[validate(range(min = 1, message = "lines_per_item must be >= 1"))]
    pub lines_per_item: usize,

    /// Stop after this many items (-1 = unlimited)
    #[serde(default = "default_item_limit")]
    #[validate(range(min = -1, message = "item_limit must be >= -1"))]
    pub item_limit: i64,

    /// Gzip batch payloads before delivery
    #[serde(default = "default_true")]
    pub gzip: bool,

    /// Gzip compression level (0-9)
    #[serde(default = "default_gzip_level")]
    #[validate(range(max = 9, message = "gzip_level must be 0-9"))]
    pub gzip_level: u32,

    /// Deliver batches (false = measure scan throughput only)
    #[serde(default = "default_true")]
    pub do_load: bool,

    /// Fail when the stream carries no dataset size marker
    #[serde(default = "default_true")]
    pub require_dataset_size: bool,

    /// Bounded queue capacity between scanner and workers (None = workers)
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    /// Capacity hint for pooled batch buffers, in bytes
    #[serde(default = "default_buffer_capacity")]
    #[validate(range(min = 1, message = "buffer_capacity must be > 0"))]
    pub buffer_capacity: usize,
}

fn default_workers() -> usize {
    1
}

fn default_batch_size() -> usize {
    5000
}

fn default_lines_per_item() -> usize {
    2
}

fn default_item_limit() -> i64 {
    -1
}

fn default_true() -> bool {
    true
}

fn default_gzip_level() -> u32 {
    6
}

fn default_buffer_capacity() -> usize {
    4 * 1024 * 1024
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            lines_per_item: default_lines_per_item(),
            item_limit: default_item_limit(),
            gzip: true,
            gzip_level: default_gzip_level(),
            do_load: true,
            require_dataset_size: true,
            queue_capacity: None,
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl LoadConfig {
    /// Item limit as an option (negative = unlimited)
    pub fn item_limit(&self) -> Option<u64> {
        u64::try_from(self.item_limit).ok()
    }

    /// Effective bounded queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers).max(1)
    }
}

/// Telemetry side channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelemetryConfig {
    /// Emit one point per delivered batch
    #[serde(default)]
    pub enabled: bool,

    /// Collector base URL (e.g. "http://localhost:8086")
    #[serde(default)]
    pub host: Option<String>,

    /// Collector database
    #[serde(default = "default_telemetry_database")]
    pub database: String,

    /// Echo points to stderr as well
    #[serde(default)]
    pub stderr: bool,

    /// Points per collector request
    #[serde(default = "default_telemetry_batch_size")]
    #[validate(range(min = 1, message = "telemetry batch_size must be >= 1"))]
    pub batch_size: usize,

    /// Flush a partial batch after this many milliseconds
    #[serde(default = "default_flush_interval_ms")]
    #[validate(range(min = 1, message = "flush_interval_ms must be >= 1"))]
    pub flush_interval_ms: u64,

    /// Intake queue capacity; points beyond it are dropped
    #[serde(default = "default_telemetry_queue_capacity")]
    #[validate(range(min = 1, message = "telemetry queue_capacity must be >= 1"))]
    pub queue_capacity: usize,

    /// Basic auth as "user:password"
    #[serde(default)]
    pub basic_auth: Option<String>,

    /// Static tags attached to every point
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_telemetry_database() -> String {
    "telegraf".to_string()
}

fn default_telemetry_batch_size() -> usize {
    100
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_telemetry_queue_capacity() -> usize {
    10_000
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: None,
            database: default_telemetry_database(),
            stderr: false,
            batch_size: default_telemetry_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            queue_capacity: default_telemetry_queue_capacity(),
            basic_auth: None,
            tags: BTreeMap::new(),
        }
    }
}

/// Result report configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportConfig {
    /// Report host base URL
    #[validate(length(min = 1, message = "report host cannot be empty"))]
    pub host: String,

    /// Report database
    #[serde(default = "default_report_database")]
    pub database: String,

    /// Target store label recorded in the report
    #[serde(default = "default_db_type")]
    pub db_type: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Extra tags sent alongside the result
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ReportConfig {
    /// Report config with default database and db type
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: default_report_database(),
            db_type: default_db_type(),
            user: None,
            password: None,
            tags: BTreeMap::new(),
        }
    }
}

fn default_report_database() -> String {
    "database_benchmarks".to_string()
}

fn default_db_type() -> String {
    "ElasticSearch".to_string()
}

/// Target used when neither a config file nor `--urls` names one
pub const DEFAULT_TARGET_URL: &str = "http://localhost:9200";

/// Delivery target
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetConfig {
    /// Target name
    #[validate(length(min = 1, message = "target name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl TargetConfig {
    /// HTTP target for a base URL
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: SinkType::Http,
            params: HashMap::from([("url".to_string(), url.into())]),
        }
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// HTTP bulk endpoint
    Http,
    /// Append to a local file
    File,
    /// Log only
    Log,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults() {
        let load = LoadConfig::default();
        assert_eq!(load.workers, 1);
        assert_eq!(load.batch_size, 5000);
        assert_eq!(load.lines_per_item, 2);
        assert_eq!(load.item_limit(), None);
        assert_eq!(load.queue_capacity(), 1);
        assert!(load.gzip);
        assert!(load.do_load);
        assert!(load.require_dataset_size);
    }

    #[test]
    fn test_item_limit_conversion() {
        let load = LoadConfig {
            item_limit: 2500,
            ..Default::default()
        };
        assert_eq!(load.item_limit(), Some(2500));

        let load = LoadConfig {
            item_limit: 0,
            ..Default::default()
        };
        assert_eq!(load.item_limit(), Some(0));
    }

    #[test]
    fn test_queue_capacity_follows_workers() {
        let load = LoadConfig {
            workers: 8,
            ..Default::default()
        };
        assert_eq!(load.queue_capacity(), 8);

        let load = LoadConfig {
            workers: 8,
            queue_capacity: Some(2),
            ..Default::default()
        };
        assert_eq!(load.queue_capacity(), 2);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = LoaderConfig {
            load: LoadConfig {
                workers: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{"load": {"workers": 4}, "targets": [{"name": "es", "sink_type": "http", "params": {"url": "http://localhost:9200"}}]}"#;
        let config: LoaderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.load.workers, 4);
        assert_eq!(config.load.batch_size, 5000);
        assert_eq!(config.targets[0].sink_type, SinkType::Http);
        assert!(config.report.is_none());
    }
}
