//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// PMDA extract - Convert PMDA package inserts into searchable medicine records.
#[derive(Debug, Parser)]
#[command(name = "pmda")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// PMDA data directory (default: the single pmda_all_YYYYMMDD directory here)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output JSON file
    #[arg(short, long, default_value = "pmda_medicines.json")]
    pub output: PathBuf,

    /// Parallel workers (default: CPU count, at most 16)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Documents per batch (default: computed)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Memory budget in MB
    #[arg(short, long)]
    pub memory_limit: Option<u64>,

    /// Worker pool kind
    #[arg(long, value_enum)]
    pub pool: Option<PoolArg>,

    /// Process every document on one thread
    #[arg(long, conflicts_with = "workers")]
    pub sequential: bool,

    /// Extract a single document and print its records to stdout
    #[arg(long)]
    pub debug_file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "PMDA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Summary format
    #[arg(short, long, value_enum)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// Worker pool options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PoolArg {
    /// Scoped OS threads
    Threads,
    /// Tokio blocking tasks
    Tasks,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

impl From<PoolArg> for pmda_batch::PoolKind {
    fn from(pool: PoolArg) -> Self {
        match pool {
            PoolArg::Threads => pmda_batch::PoolKind::Threads,
            PoolArg::Tasks => pmda_batch::PoolKind::Tasks,
        }
    }
}
