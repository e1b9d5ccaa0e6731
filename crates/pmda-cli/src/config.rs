//! Configuration management for the CLI.

use crate::cli::Cli;
use crate::error::{CliError, Result};
use pmda_batch::{BatchConfig, PoolKind};
use pmda_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "pmda.toml";

/// Upper bound on the detected default worker count.
pub const MAX_DEFAULT_WORKERS: usize = 16;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Extractor settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Batch settings; unset fields fall back to flags or detected defaults
    #[serde(default)]
    pub batch: BatchSection,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// `[batch]` table of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit_mb: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_document_mb: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_batch_size: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default summary format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Get the user-level configuration file path.
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pmda").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise `./pmda.toml` is tried, then
    /// the user configuration file, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(CliError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.is_file() {
            return Self::from_file(&local);
        }

        match Self::user_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Read and parse one configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the batch configuration: flags over file values over defaults.
    pub fn resolve_batch(&self, cli: &Cli) -> Result<BatchConfig> {
        let defaults = BatchConfig::default();
        let section = &self.batch;

        let workers = if cli.sequential {
            1
        } else {
            cli.workers
                .or(section.workers)
                .unwrap_or_else(default_workers)
        };

        let config = BatchConfig {
            workers,
            batch_size: cli.batch_size.or(section.batch_size),
            memory_limit_mb: cli
                .memory_limit
                .or(section.memory_limit_mb)
                .unwrap_or(defaults.memory_limit_mb),
            pool: cli
                .pool
                .map(Into::into)
                .or(section.pool)
                .unwrap_or(defaults.pool),
            estimated_document_mb: section
                .estimated_document_mb
                .unwrap_or(defaults.estimated_document_mb),
            min_batch_size: section.min_batch_size.unwrap_or(defaults.min_batch_size),
            max_batch_size: section.max_batch_size.unwrap_or(defaults.max_batch_size),
        };

        config.validate().map_err(CliError::Config)?;
        Ok(config)
    }
}

/// Default worker count: available parallelism, at most 16.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
