//! PMDA Batch
//!
//! Parallel pipeline that runs the extractor over a whole document set.
//!
//! # Overview
//!
//! The batch layer is responsible for:
//! - **Content identity**: documents with identical bytes are parsed once,
//!   the first in discovery order wins
//! - **Scheduling**: the deduplicated set is cut into contiguous batches
//!   sized from the memory budget and the worker count
//! - **Execution**: a bounded pool (scoped threads or tokio blocking tasks)
//!   assigns whole batches to workers
//! - **Isolation**: a failure on one document becomes an error entry and the
//!   batch carries on
//! - **Metrics**: per-stage and per-category counters for the caller's report
//!
//! # Equivalence
//!
//! Parallelism is a throughput optimization only. Every document goes
//! through the same per-document function in both modes, and batch outputs
//! are merged in dispatch order, so a parallel run yields exactly the
//! records and errors of a sequential run.
//!
//! # Usage
//!
//! ```no_run
//! use pmda_batch::{BatchConfig, BatchRunner, PoolKind};
//! use pmda_extractor::ExtractorConfig;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig {
//!         workers: 8,
//!         pool: PoolKind::Tasks,
//!         ..Default::default()
//!     };
//!     let runner = BatchRunner::new(config, ExtractorConfig::default())?;
//!
//!     let candidates: Vec<PathBuf> = vec![];
//!     let report = runner.run(&candidates).await?;
//!
//!     println!("Records: {}", report.records.len());
//!     println!("Errors: {}", report.errors.len());
//!     println!("\n{}", report.metrics.summary());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The runner can be configured via TOML:
//!
//! ```toml
//! [batch]
//! workers = 8
//! memory_limit_mb = 2048
//! pool = "threads"
//! estimated_document_mb = 0.1
//! min_batch_size = 10
//! max_batch_size = 500
//! ```

#![warn(missing_docs)]

mod config;
mod digest;
mod error;
mod metrics;
mod runner;
mod scheduler;
mod worker;

pub use config::{BatchConfig, PoolKind};
pub use digest::{deduplicate, Candidate, ContentDigest, DedupOutcome};
pub use error::{BatchError, DocumentError, ErrorStage};
pub use metrics::RunMetrics;
pub use runner::{BatchRunner, RunReport};
pub use scheduler::{batch_size, plan, BatchPlan};
pub use worker::{process_batch, process_document, BatchOutput, WorkerPool};
