//! Batch runner: dedup, schedule, dispatch, merge

use pmda_domain::MedicineRecord;
use pmda_extractor::{DocumentExtractor, ExtractorConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::BatchConfig;
use crate::digest::deduplicate;
use crate::error::{BatchError, DocumentError};
use crate::metrics::RunMetrics;
use crate::scheduler::plan;
use crate::worker::{process_batch, BatchOutput, WorkerPool};

/// Everything a run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Records of every document, in discovery order
    pub records: Vec<MedicineRecord>,
    /// Unreadable and failed documents, in discovery order
    pub errors: Vec<DocumentError>,
    /// Per-stage counters
    pub metrics: RunMetrics,
}

/// Runs the extraction pipeline over a set of candidate documents
///
/// # Examples
///
/// ```no_run
/// use pmda_batch::{BatchConfig, BatchRunner};
/// use pmda_extractor::ExtractorConfig;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runner = BatchRunner::new(BatchConfig::default(), ExtractorConfig::default())?;
///     let candidates = vec![PathBuf::from("SGML_XML/4291001F1020_1_01.xml")];
///
///     let report = runner.run(&candidates).await?;
///     println!("{}", report.metrics.summary());
///     Ok(())
/// }
/// ```
pub struct BatchRunner {
    config: BatchConfig,
    extractor: Arc<DocumentExtractor>,
}

impl BatchRunner {
    /// Create a runner; fails on invalid configuration
    pub fn new(config: BatchConfig, extractor_config: ExtractorConfig) -> Result<Self, BatchError> {
        Self::with_extractor(config, DocumentExtractor::new(extractor_config)?)
    }

    /// Create a runner around an existing extractor
    pub fn with_extractor(config: BatchConfig, extractor: DocumentExtractor) -> Result<Self, BatchError> {
        config.validate().map_err(BatchError::Config)?;
        Ok(Self {
            config,
            extractor: Arc::new(extractor),
        })
    }

    /// Create a runner with default configuration
    pub fn default_config() -> Result<Self, BatchError> {
        Self::new(BatchConfig::default(), ExtractorConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Extractor shared by every worker
    pub fn extractor(&self) -> &DocumentExtractor {
        &self.extractor
    }

    /// Run the pipeline over `candidates`
    ///
    /// The merged output does not depend on the worker count, the pool kind
    /// or the batch size: sequential and parallel runs produce the same
    /// records and the same errors in the same order.
    ///
    /// # Errors
    ///
    /// Returns an error only when the worker pool fails; per-document
    /// failures are reported in [`RunReport::errors`].
    pub async fn run(&self, candidates: &[PathBuf]) -> Result<RunReport, BatchError> {
        let started = Instant::now();
        let mut metrics = RunMetrics::new();

        let dedup = deduplicate(candidates);
        metrics.record_discovery(candidates.len(), dedup.unreadable.len(), dedup.duplicates);

        let documents = Arc::new(dedup.unique);
        let plan = plan(&self.config, documents.len());
        let workers = if self.config.is_sequential() {
            // One pass over everything on the calling thread
            metrics.record_plan(usize::from(!documents.is_empty()), documents.len(), 1);
            1
        } else {
            let workers = self.config.workers.min(plan.len().max(1));
            metrics.record_plan(plan.len(), plan.batch_size, workers);
            workers
        };

        tracing::info!(
            documents = documents.len(),
            duplicates = dedup.duplicates,
            batches = plan.len(),
            batch_size = plan.batch_size,
            workers,
            "Starting extraction run"
        );

        let outputs = if self.config.is_sequential() {
            let extractor = Arc::clone(&self.extractor);
            let documents = Arc::clone(&documents);
            let output = tokio::task::spawn_blocking(move || process_batch(&extractor, &documents))
                .await
                .map_err(|e| BatchError::Worker(e.to_string()))?;
            vec![output]
        } else {
            WorkerPool::new(self.config.pool, workers)
                .run(Arc::clone(&self.extractor), Arc::clone(&documents), plan.batches)
                .await?
        };

        let mut merged = BatchOutput::default();
        for output in outputs {
            merged.append(output);
        }

        for nodes in &merged.nodes_visited {
            metrics.record_document(*nodes);
        }
        for _ in &merged.errors {
            metrics.record_failure();
        }
        for record in &merged.records {
            metrics.record_record(record);
        }
        metrics.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            records = metrics.records_produced,
            failed = metrics.documents_failed,
            elapsed_ms = metrics.elapsed_ms,
            "Extraction run complete"
        );

        let mut errors = dedup.unreadable;
        errors.extend(merged.errors);

        Ok(RunReport {
            records: merged.records,
            errors,
            metrics,
        })
    }
}
