//! `run` command implementation.

use anyhow::{Context, Result};
use bulkload_cli::pipeline::print_details;
use bulkload_cli::{InfluxReporter, Pipeline, PipelineConfig, PipelineError, RunOutcome};
use contracts::{ItemSource, LoaderConfig, ReportConfig, TargetConfig, DEFAULT_TARGET_URL};
use ingestion::LineSource;
use std::time::Duration;
use tracing::{error, info, warn};

use super::load_config;
use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_load(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    config_loader::validate(&config).context("Invalid configuration")?;

    info!(
        workers = config.load.workers,
        batch_size = config.load.batch_size,
        item_limit = config.load.item_limit,
        gzip = config.load.gzip,
        do_load = config.load.do_load,
        targets = config.targets.len(),
        "Configuration loaded"
    );

    let pipeline_config = PipelineConfig {
        progress_interval: (args.progress_secs > 0)
            .then(|| Duration::from_secs(args.progress_secs)),
        ..PipelineConfig::from(config)
    };
    let pipeline = Pipeline::new(pipeline_config);

    let outcome = match &args.input {
        Some(path) => {
            let source = LineSource::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            run_until_signal(&pipeline, source).await?
        }
        None => run_until_signal(&pipeline, LineSource::stdin()).await?,
    };

    println!("{}", outcome.stats.summary_line());
    if !args.summary_only {
        print_details(&outcome);
    }

    if let Some(report_config) = &pipeline.config().report {
        send_report(&pipeline, report_config, &outcome).await?;
    }

    Ok(())
}

async fn run_until_signal<S: ItemSource + 'static>(
    pipeline: &Pipeline,
    source: S,
) -> Result<RunOutcome> {
    tokio::select! {
        result = pipeline.run(source) => result.context("Load failed"),
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, aborting load");
            anyhow::bail!("Load interrupted")
        }
    }
}

async fn send_report(
    pipeline: &Pipeline,
    report_config: &ReportConfig,
    outcome: &RunOutcome,
) -> Result<()> {
    let result = match InfluxReporter::from_config(report_config) {
        Ok(mut reporter) => pipeline.report(&mut reporter, report_config, &outcome.stats).await,
        Err(e) => Err(PipelineError::report(&report_config.host, e)),
    };

    result
        .inspect_err(|e| error!(error = %e, "Reporting failed after a completed load"))
        .context("Result reporting failed")
}

/// Apply command-line overrides on top of the file (or default) config
pub(crate) fn apply_overrides(config: &mut LoaderConfig, args: &RunArgs) {
    let load = &mut config.load;
    if let Some(workers) = args.workers {
        load.workers = workers;
    }
    if let Some(batch_size) = args.batch_size {
        load.batch_size = batch_size;
    }
    if let Some(lines_per_item) = args.lines_per_item {
        load.lines_per_item = lines_per_item;
    }
    if let Some(item_limit) = args.item_limit {
        load.item_limit = item_limit;
    }
    if let Some(gzip) = args.gzip_override() {
        load.gzip = gzip;
    }
    if let Some(level) = args.gzip_level {
        load.gzip_level = level;
    }
    if args.no_load {
        load.do_load = false;
    }
    if args.allow_missing_dataset_size {
        load.require_dataset_size = false;
    }

    if !args.urls.is_empty() {
        config.targets = args
            .urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .enumerate()
            .map(|(i, url)| TargetConfig::http(format!("url-{i}"), url))
            .collect();
    }
    if config.targets.is_empty() && config.load.do_load {
        info!(url = DEFAULT_TARGET_URL, "No target configured, using the default");
        config.targets.push(TargetConfig::http("default", DEFAULT_TARGET_URL));
    }

    if let Some(host) = &args.telemetry_host {
        config.telemetry.enabled = true;
        config.telemetry.host = Some(host.clone());
    }
    if args.telemetry_stderr {
        config.telemetry.enabled = true;
        config.telemetry.stderr = true;
    }

    if let Some(host) = &args.report_host {
        match &mut config.report {
            Some(report) => report.host = host.clone(),
            None => config.report = Some(ReportConfig::new(host.clone())),
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
