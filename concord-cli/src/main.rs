//! Concord CLI: inter-annotator agreement reports for Label Studio exports.
//!
//! Reads one JSON export, prints (or writes) one report.

mod commands;

use anyhow::Context;
use clap::Parser;
use concord_core::{ReportFormat, TaskType};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Concord: how well do your annotators agree?
#[derive(Parser, Debug)]
#[command(name = "concord", version, about, long_about = None)]
struct Cli {
    /// Label Studio JSON export file
    export: Option<PathBuf>,

    /// Output format: text, markdown, json
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Override the detected task type: classification, span, paragraph
    #[arg(short, long)]
    task_type: Option<TaskType>,

    /// Decimals printed for scores
    #[arg(long)]
    precision: Option<usize>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Workspace directory (holds .concord/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the task type detected in an export
    Detect {
        /// Label Studio JSON export file
        export: PathBuf,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

/// Human-readable stderr output plus a JSON log file. The guard flushes the
/// file writer on drop and must outlive the program body.
fn init_tracing(verbose: u8, quiet: bool) -> WorkerGuard {
    let filter = match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)));

    let log_dir = directories::ProjectDirs::from("dev", "concord", "concord")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "concord.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.quiet);

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Some(command) = cli.command {
        return commands::handle_command(command, &workspace);
    }

    let Some(export) = cli.export else {
        anyhow::bail!("No export file given. Run `concord --help` for usage.");
    };

    let mut config =
        concord_core::load_config(Some(&workspace)).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.report.format = format;
    }
    if let Some(task_type) = cli.task_type {
        config.report.task_type = Some(task_type);
    }
    if let Some(precision) = cli.precision {
        config.report.precision = precision;
    }

    commands::run_report(&export, &config.report, cli.output.as_deref())
}
