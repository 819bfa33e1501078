//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::LoaderConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    workers: usize,
    batch_size: usize,
    item_limit: i64,
    gzip: bool,
    target_count: usize,
    telemetry: bool,
    report: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    workers: config.load.workers,
                    batch_size: config.load.batch_size,
                    item_limit: config.load.item_limit,
                    gzip: config.load.gzip,
                    target_count: config.targets.len(),
                    telemetry: config.telemetry.enabled,
                    report: config.report.is_some(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &LoaderConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let load = &config.load;

    if !load.do_load {
        warnings.push("do_load is disabled - batches are scanned and discarded".to_string());
    }

    if !config.targets.is_empty() && load.workers < config.targets.len() {
        warnings.push(format!(
            "{} workers for {} targets - {} target(s) will receive nothing",
            load.workers,
            config.targets.len(),
            config.targets.len() - load.workers
        ));
    }

    if load.gzip && load.gzip_level == 0 {
        warnings.push(
            "gzip enabled with gzip_level 0 - payloads are stored uncompressed".to_string(),
        );
    }

    if !load.require_dataset_size {
        warnings.push(
            "require_dataset_size is disabled - a truncated input stream goes unnoticed"
                .to_string(),
        );
    }

    if load.item_limit == 0 {
        warnings.push("item_limit is 0 - nothing will be loaded".to_string());
    }

    if !config.telemetry.enabled && config.telemetry.host.is_some() {
        warnings.push("telemetry.host is set but telemetry is disabled".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Workers: {}", summary.workers);
            println!("  Batch size: {}", summary.batch_size);
            println!("  Item limit: {}", summary.item_limit);
            println!("  Gzip: {}", summary.gzip);
            println!("  Targets: {}", summary.target_count);
            println!("  Telemetry: {}", summary.telemetry);
            println!("  Report: {}", summary.report);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
