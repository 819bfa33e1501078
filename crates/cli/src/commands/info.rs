//! `info` command implementation.

use anyhow::{Context, Result};
use bulkload_cli::pipeline::destination_label;
use contracts::{LoaderConfig, SinkType, TargetConfig};
use serde::Serialize;

use super::load_config;
use crate::cli::InfoArgs;

/// Effective configuration for JSON output
#[derive(Serialize)]
struct ConfigInfo<'a> {
    config: &'a LoaderConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignment: Vec<WorkerAssignment>,
}

#[derive(Serialize)]
struct WorkerAssignment {
    worker: usize,
    target: String,
    sink_type: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    if args.json {
        let info = ConfigInfo {
            config: &config,
            assignment: if args.targets {
                worker_assignment(&config)
            } else {
                Vec::new()
            },
        };
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn worker_assignment(config: &LoaderConfig) -> Vec<WorkerAssignment> {
    dispatcher::assign_targets(config.load.workers, &config.targets)
        .into_iter()
        .enumerate()
        .map(|(worker, target)| WorkerAssignment {
            worker,
            target: target_label(target),
            sink_type: format!("{:?}", target.sink_type),
        })
        .collect()
}

fn target_label(target: &TargetConfig) -> String {
    destination_label(std::slice::from_ref(target))
}

fn print_config_info(config: &LoaderConfig, args: &InfoArgs) {
    let load = &config.load;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Bulk Loader Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📦 Load");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Workers: {}", load.workers);
    println!("   ├─ Batch size: {} items", load.batch_size);
    println!("   ├─ Lines per item: {}", load.lines_per_item);
    match load.item_limit() {
        Some(limit) => println!("   ├─ Item limit: {}", limit),
        None => println!("   ├─ Item limit: unlimited"),
    }
    println!("   ├─ Gzip: {} (level {})", load.gzip, load.gzip_level);
    println!("   ├─ Queue capacity: {} batches", load.queue_capacity());
    println!("   └─ Deliver: {}", load.do_load);

    let telemetry = &config.telemetry;
    println!("\n📡 Telemetry");
    if telemetry.enabled {
        println!(
            "   ├─ Host: {}",
            telemetry.host.as_deref().unwrap_or("(none)")
        );
        println!("   ├─ Database: {}", telemetry.database);
        println!("   ├─ Stderr: {}", telemetry.stderr);
        println!(
            "   └─ Batch: {} points / {} ms",
            telemetry.batch_size, telemetry.flush_interval_ms
        );
    } else {
        println!("   └─ Disabled");
    }

    if let Some(report) = &config.report {
        println!("\n📊 Report");
        println!("   ├─ Host: {}", report.host);
        println!("   ├─ Database: {}", report.database);
        println!("   └─ DB type: {}", report.db_type);
    }

    println!("\n📤 Targets ({})", config.targets.len());
    for (i, target) in config.targets.iter().enumerate() {
        let prefix = if i == config.targets.len() - 1 { "└─" } else { "├─" };
        let kind = match target.sink_type {
            SinkType::Http => "http",
            SinkType::File => "file",
            SinkType::Log => "log",
        };
        println!("   {} {} ({}) {}", prefix, target.name, kind, target_label(target));
    }

    if args.targets && !config.targets.is_empty() {
        println!("\n👷 Workers");
        let assignment = worker_assignment(config);
        for (i, entry) in assignment.iter().enumerate() {
            let prefix = if i == assignment.len() - 1 { "└─" } else { "├─" };
            println!("   {} worker {} → {}", prefix, entry.worker, entry.target);
        }
    }

    println!();
}
