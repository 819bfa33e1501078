//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `LoaderConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("bulkload.toml")).unwrap();
//! println!("Workers: {}", config.load.workers);
//! ```

mod parser;
mod validator;

pub use contracts::LoaderConfig;
pub use parser::ConfigFormat;
pub use validator::validate;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<LoaderConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<LoaderConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize LoaderConfig to TOML string
    pub fn to_toml(config: &LoaderConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize LoaderConfig to JSON string
    pub fn to_json(config: &LoaderConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<LoaderConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkType;

    const MINIMAL_TOML: &str = r#"
[load]
workers = 4
batch_size = 1000
item_limit = -1
gzip = false

[telemetry]
enabled = true
host = "http://localhost:8086"
batch_size = 50
[telemetry.tags]
run = "nightly"

[[targets]]
name = "es-1"
sink_type = "http"
[targets.params]
url = "http://localhost:9200"

[[targets]]
name = "es-2"
sink_type = "http"
[targets.params]
url = "http://localhost:9201"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.load.workers, 4);
        assert_eq!(config.load.batch_size, 1000);
        assert_eq!(config.load.lines_per_item, 2);
        assert!(!config.load.gzip);
        assert_eq!(config.telemetry.batch_size, 50);
        assert_eq!(config.telemetry.tags.get("run").map(String::as_str), Some("nightly"));
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[1].sink_type, SinkType::Http);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.load.workers, config2.load.workers);
        assert_eq!(config.targets.len(), config2.targets.len());
        assert_eq!(config.targets[0].name, config2.targets[0].name);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.load.batch_size, config2.load.batch_size);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // Duplicate target name should fail validation
        let content = r#"
[[targets]]
name = "es"
sink_type = "log"

[[targets]]
name = "es"
sink_type = "log"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = ConfigLoader::load_from_path(Path::new("bulkload.yaml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unsupported"));
    }
}
