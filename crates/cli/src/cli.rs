//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// bulkload - concurrent bulk loader and load-benchmark driver
#[derive(Parser, Debug)]
#[command(
    name = "bulkload",
    author,
    version,
    about = "Concurrent bulk-loading pipeline",
    long_about = "Reads newline-delimited items from stdin or a file, groups them into \n\
                  batches and delivers them concurrently to one or more HTTP bulk \n\
                  endpoints, reporting throughput when done."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BULKLOAD_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "BULKLOAD_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "BULKLOAD_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level from -v/-q (RUST_LOG still wins)
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load items into the configured targets
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when absent
    #[arg(short, long, env = "BULKLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read items from this file instead of stdin
    #[arg(short, long, env = "BULKLOAD_INPUT")]
    pub input: Option<PathBuf>,

    /// Comma-separated target base URLs; worker i uses urls[i % len]
    #[arg(long, value_delimiter = ',', env = "BULKLOAD_URLS")]
    pub urls: Vec<String>,

    /// Number of concurrent delivery workers
    #[arg(short, long, env = "BULKLOAD_WORKERS")]
    pub workers: Option<usize>,

    /// Items per batch
    #[arg(long, env = "BULKLOAD_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Input lines per item
    #[arg(long, env = "BULKLOAD_LINES_PER_ITEM")]
    pub lines_per_item: Option<usize>,

    /// Stop after this many items (-1 = unlimited)
    #[arg(long, allow_hyphen_values = true, env = "BULKLOAD_ITEM_LIMIT")]
    pub item_limit: Option<i64>,

    /// Gzip batch payloads
    #[arg(long)]
    pub gzip: bool,

    /// Send batch payloads uncompressed
    #[arg(long)]
    pub no_gzip: bool,

    /// Gzip level (0-9)
    #[arg(long, env = "BULKLOAD_GZIP_LEVEL")]
    pub gzip_level: Option<u32>,

    /// Scan and batch only, do not deliver
    #[arg(long)]
    pub no_load: bool,

    /// Accept input without a dataset size marker (the item count is not checked)
    #[arg(long)]
    pub allow_missing_dataset_size: bool,

    /// Telemetry collector base URL (enables telemetry)
    #[arg(long, env = "BULKLOAD_TELEMETRY_HOST")]
    pub telemetry_host: Option<String>,

    /// Echo telemetry points to stderr (enables telemetry)
    #[arg(long)]
    pub telemetry_stderr: bool,

    /// Result report host base URL
    #[arg(long, env = "BULKLOAD_REPORT_HOST")]
    pub report_host: Option<String>,

    /// Log delivery progress every N seconds (0 = disabled)
    #[arg(long, default_value = "0", env = "BULKLOAD_PROGRESS_SECS")]
    pub progress_secs: u64,

    /// Skip the detailed statistics after the summary line
    #[arg(long)]
    pub summary_only: bool,
}

impl RunArgs {
    /// Gzip override, if either flag was given
    pub fn gzip_override(&self) -> Option<bool> {
        match (self.gzip, self.no_gzip) {
            (_, true) => Some(false),
            (true, false) => Some(true),
            (false, false) => None,
        }
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bulkload.toml", env = "BULKLOAD_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when absent
    #[arg(short, long, env = "BULKLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show worker to target assignment
    #[arg(long)]
    pub targets: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bulkload").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_run_overrides() {
        let cli = parse(&[
            "run",
            "--urls",
            "http://a:9200,http://b:9200",
            "--workers",
            "4",
            "--item-limit",
            "-1",
            "--no-gzip",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.urls, vec!["http://a:9200", "http://b:9200"]);
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.item_limit, Some(-1));
        assert_eq!(args.gzip_override(), Some(false));
        assert!(args.config.is_none());
        assert!(!args.allow_missing_dataset_size);
    }

    #[test]
    fn test_allow_missing_dataset_size_flag() {
        let Commands::Run(args) = parse(&["run", "--allow-missing-dataset-size"]).command else {
            panic!("expected run");
        };
        assert!(args.allow_missing_dataset_size);
    }

    #[test]
    fn test_gzip_flags() {
        let Commands::Run(args) = parse(&["run", "--gzip"]).command else {
            panic!("expected run");
        };
        assert_eq!(args.gzip_override(), Some(true));

        let Commands::Run(args) = parse(&["run"]).command else {
            panic!("expected run");
        };
        assert_eq!(args.gzip_override(), None);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["-q", "info"]).log_level(), "warn");
        assert_eq!(parse(&["-vv", "info"]).log_level(), "trace");
        assert_eq!(parse(&["info"]).log_level(), "info");
    }
}
