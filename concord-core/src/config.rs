//! Configuration system for Concord.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! Configuration is loaded from `~/.config/concord/config.toml` and/or
//! `.concord/config.toml` in the workspace directory. CLI flags are applied by
//! the caller on top of the loaded value.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::detect::TaskType;
use crate::error::Result;
use crate::report::ReportFormat;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConcordConfig {
    /// Report generation settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Report generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output layout.
    #[serde(default)]
    pub format: ReportFormat,
    /// Force a task type instead of detecting it from the export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    /// Number of decimals used when printing scores.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            task_type: None,
            precision: default_precision(),
        }
    }
}

fn default_precision() -> usize {
    3
}

/// Name of the per-workspace configuration directory.
pub const WORKSPACE_CONFIG_DIR: &str = ".concord";

/// Path of the workspace-level configuration file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_CONFIG_DIR).join("config.toml")
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "concord", "concord")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from all layers.
pub fn load_config(workspace: Option<&Path>) -> Result<ConcordConfig> {
    let mut figment = Figment::from(Serialized::defaults(ConcordConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // CONCORD_REPORT__FORMAT, CONCORD_REPORT__PRECISION, ...
    figment = figment.merge(Env::prefixed("CONCORD_").split("__"));

    let config = figment.extract().map_err(Box::new)?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConcordConfig::default();
        assert_eq!(config.report.format, ReportFormat::Text);
        assert_eq!(config.report.precision, 3);
        assert!(config.report.task_type.is_none());
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(WORKSPACE_CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[report]
format = "markdown"
task_type = "paragraph"
precision = 2
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.report.format, ReportFormat::Markdown);
        assert_eq!(config.report.task_type, Some(TaskType::Paragraph));
        assert_eq!(config.report.precision, 2);
    }

    #[test]
    fn test_load_config_rejects_bad_format() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(WORKSPACE_CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[report]\nformat = \"pdf\"\n").unwrap();

        assert!(load_config(Some(dir.path())).is_err());
    }

    #[test]
    fn test_config_toml_roundtrip_omits_unset_task_type() {
        let config = ConcordConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(!text.contains("task_type"));
        let parsed: ConcordConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
