//! Subcommand handlers and the default report run.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use concord_core::config::workspace_config_path;
use concord_core::{ConcordConfig, Export, ReportConfig, TaskType, detect_task_type};
use std::path::Path;

pub fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Detect { export } => {
            println!("{}", detect_file(&export)?);
            Ok(())
        }
        Commands::Config { action } => handle_config(action, workspace),
    }
}

/// Render the report for `export_path` and send it to `output` or stdout.
pub fn run_report(
    export_path: &Path,
    config: &ReportConfig,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let report = render_report(export_path, config)?;
    match output {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{report}"),
    }
    Ok(())
}

fn render_report(export_path: &Path, config: &ReportConfig) -> anyhow::Result<String> {
    let export = read_export(export_path)?;
    if export.is_empty() {
        anyhow::bail!("Empty export file.");
    }
    tracing::info!(
        path = %export_path.display(),
        tasks = export.len(),
        format = %config.format,
        "generating agreement report"
    );
    Ok(concord_core::generate_report(&export, config)?)
}

fn read_export(path: &Path) -> anyhow::Result<Export> {
    Export::from_path(path).with_context(|| format!("Failed to read export {}", path.display()))
}

fn detect_file(path: &Path) -> anyhow::Result<TaskType> {
    let export = read_export(path)?;
    Ok(detect_task_type(export.records()))
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = toml::to_string_pretty(&ConcordConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = concord_core::load_config(Some(workspace))
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
