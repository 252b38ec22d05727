use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::outputs::{ExportFormat, TableFormat};
use crate::pipeline::PipelineOptions;
use crate::types::SlotCollision;

pub const ENV_CONFIG_PATH: &str = "HALFHOUR_CONFIG";
pub const ENV_OUT_DIR: &str = "HALFHOUR_OUT_DIR";
pub const ENV_EXPORT_FORMAT: &str = "HALFHOUR_EXPORT_FORMAT";
pub const ENV_TABLE_FORMAT: &str = "HALFHOUR_TABLE_FORMAT";
pub const ENV_PIVOT_COLLISION: &str = "HALFHOUR_PIVOT_COLLISION";
pub const ENV_LOG_FORMAT: &str = "HALFHOUR_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Pretty => f.write_str("pretty"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Settings for one analyzer run. Layered as defaults, TOML file, environment, then
/// command-line flags (applied by the binary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub out_dir: PathBuf,
    pub export_format: ExportFormat,
    pub table_format: TableFormat,
    pub pivot_collision: SlotCollision,
    pub log_format: LogFormat,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("halfhour-output"),
            export_format: ExportFormat::default(),
            table_format: TableFormat::default(),
            pivot_collision: SlotCollision::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| PipelineError::Config(err.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|err| match err {
            PipelineError::Config(message) => {
                PipelineError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Overrides fields from `HALFHOUR_*` variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_OUT_DIR) {
            self.out_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_EXPORT_FORMAT) {
            self.export_format = parse_setting(ENV_EXPORT_FORMAT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TABLE_FORMAT) {
            self.table_format = parse_setting(ENV_TABLE_FORMAT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PIVOT_COLLISION) {
            self.pivot_collision = parse_setting(ENV_PIVOT_COLLISION, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            self.log_format = parse_setting(ENV_LOG_FORMAT, &raw)?;
        }
        Ok(())
    }

    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            pivot_collision: self.pivot_collision,
        }
    }
}

fn parse_setting<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    raw.parse()
        .map_err(|err: String| PipelineError::Config(format!("{key}: {err}")))
}
