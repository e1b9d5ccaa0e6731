//! Configuration for batch runs
//!
//! Worker count and memory budget are injected by the caller; the batch
//! layer never inspects the host for them.

use serde::{Deserialize, Serialize};

/// Executor backing the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// Scoped OS threads pulling batches from a shared counter
    #[default]
    Threads,
    /// Blocking tasks on the tokio runtime, bounded by a semaphore
    Tasks,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolKind::Threads => write!(f, "threads"),
            PoolKind::Tasks => write!(f, "tasks"),
        }
    }
}

/// Configuration for the batch runner
///
/// # Examples
///
/// ```
/// use pmda_batch::{BatchConfig, PoolKind};
///
/// let config = BatchConfig::default();
/// assert_eq!(config.memory_limit_mb, 2048);
/// assert_eq!(config.pool, PoolKind::Threads);
///
/// let config = BatchConfig::sequential();
/// assert_eq!(config.workers, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of parallel workers; 1 runs everything on the calling thread
    pub workers: usize,

    /// Fixed documents per batch, overriding the computed size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Memory budget for in-flight documents (in megabytes)
    pub memory_limit_mb: u64,

    /// Executor backing the worker pool
    pub pool: PoolKind,

    /// Assumed memory footprint of one document while extracting (in megabytes)
    pub estimated_document_mb: f64,

    /// Smallest computed batch
    pub min_batch_size: usize,

    /// Largest computed batch
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    /// Four thread workers, 2 GB budget, batches of 10 to 500 documents
    fn default() -> Self {
        Self {
            workers: 4,
            batch_size: None,
            memory_limit_mb: 2048,
            pool: PoolKind::Threads,
            estimated_document_mb: 0.1,
            min_batch_size: 10,
            max_batch_size: 500,
        }
    }
}

impl BatchConfig {
    /// Single-worker configuration; every document runs on the calling thread
    pub fn sequential() -> Self {
        Self {
            workers: 1,
            ..Self::default()
        }
    }

    /// Whether the run bypasses the worker pool
    pub fn is_sequential(&self) -> bool {
        self.workers <= 1
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be at least 1".to_string());
        }
        if self.memory_limit_mb == 0 {
            return Err("memory_limit_mb must be positive".to_string());
        }
        if self.estimated_document_mb.is_nan() || self.estimated_document_mb <= 0.0 {
            return Err("estimated_document_mb must be positive".to_string());
        }
        if self.min_batch_size == 0 {
            return Err("min_batch_size must be at least 1".to_string());
        }
        if self.min_batch_size > self.max_batch_size {
            return Err(format!(
                "min_batch_size ({}) exceeds max_batch_size ({})",
                self.min_batch_size, self.max_batch_size
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
