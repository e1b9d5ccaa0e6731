//! Worker pool and the per-document pipeline
//!
//! Every document, in sequential and parallel mode alike, goes through
//! [`process_batch`]. A worker owns whole batches and shares nothing
//! mutable with other workers; results are put back in batch order before
//! they leave this module.

use pmda_domain::MedicineRecord;
use pmda_extractor::{DocumentExtraction, DocumentExtractor, ExtractorError};
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::PoolKind;
use crate::digest::{display_name, Candidate, ContentDigest};
use crate::error::{BatchError, DocumentError, ErrorStage};

/// Output of one batch, documents in input order
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    /// Records of every successful document
    pub records: Vec<MedicineRecord>,
    /// Failed documents
    pub errors: Vec<DocumentError>,
    /// Walker node counts of the successful documents
    pub nodes_visited: Vec<usize>,
}

impl BatchOutput {
    /// Append another batch's output
    pub fn append(&mut self, other: BatchOutput) {
        self.records.extend(other.records);
        self.errors.extend(other.errors);
        self.nodes_visited.extend(other.nodes_visited);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Read and extract one document
///
/// The bytes must still match the digest taken during deduplication.
/// Read failures, changed content, malformed markup and panics inside
/// extraction all come back as a [`DocumentError`]; nothing escapes this
/// boundary.
pub fn process_document(
    extractor: &DocumentExtractor,
    candidate: &Candidate,
) -> Result<DocumentExtraction, DocumentError> {
    let filename = display_name(&candidate.path);

    let bytes = std::fs::read(&candidate.path)
        .map_err(|e| DocumentError::new(filename.clone(), ErrorStage::Read, e.to_string()))?;
    if ContentDigest::of(&bytes) != candidate.digest {
        return Err(DocumentError::new(
            filename,
            ErrorStage::Read,
            "content changed since deduplication",
        ));
    }

    match panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(&filename, &bytes))) {
        Ok(Ok(extraction)) => Ok(extraction),
        Ok(Err(ExtractorError::Encoding(message))) | Ok(Err(ExtractorError::Parse(message))) => {
            Err(DocumentError::new(filename, ErrorStage::Parse, message))
        }
        Ok(Err(other)) => Err(DocumentError::new(filename, ErrorStage::Parse, other.to_string())),
        Err(payload) => Err(DocumentError::new(
            filename,
            ErrorStage::Panic,
            panic_message(payload.as_ref()),
        )),
    }
}

/// Run every document of a batch, in order, on the current thread
pub fn process_batch(extractor: &DocumentExtractor, documents: &[Candidate]) -> BatchOutput {
    let mut output = BatchOutput::default();

    for candidate in documents {
        match process_document(extractor, candidate) {
            Ok(extraction) => {
                output.nodes_visited.push(extraction.nodes_visited);
                output.records.extend(extraction.records);
            }
            Err(error) => {
                tracing::warn!("Document failed: {}", error);
                output.errors.push(error);
            }
        }
    }

    output
}

/// Bounded pool running whole batches in parallel
pub struct WorkerPool {
    kind: PoolKind,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool of `workers` executors of the given kind
    pub fn new(kind: PoolKind, workers: usize) -> Self {
        Self {
            kind,
            workers: workers.max(1),
        }
    }

    /// Number of executors
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every batch and return the outputs in batch order
    ///
    /// # Errors
    ///
    /// Returns an error only when the pool itself fails (a worker could not
    /// be joined); document failures are part of the outputs.
    pub async fn run(
        &self,
        extractor: Arc<DocumentExtractor>,
        documents: Arc<Vec<Candidate>>,
        batches: Vec<Range<usize>>,
    ) -> Result<Vec<BatchOutput>, BatchError> {
        tracing::debug!(
            pool = %self.kind,
            workers = self.workers,
            batches = batches.len(),
            "Dispatching batches"
        );

        match self.kind {
            PoolKind::Threads => {
                let workers = self.workers;
                tokio::task::spawn_blocking(move || {
                    run_threads(&extractor, &documents, &batches, workers)
                })
                .await
                .map_err(|e| BatchError::Worker(e.to_string()))?
            }
            PoolKind::Tasks => self.run_tasks(extractor, documents, batches).await,
        }
    }

    async fn run_tasks(
        &self,
        extractor: Arc<DocumentExtractor>,
        documents: Arc<Vec<Candidate>>,
        batches: Vec<Range<usize>>,
    ) -> Result<Vec<BatchOutput>, BatchError> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut set = JoinSet::new();
        let total = batches.len();

        for (id, range) in batches.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| BatchError::Worker(e.to_string()))?;
            let extractor = Arc::clone(&extractor);
            let documents = Arc::clone(&documents);

            set.spawn_blocking(move || {
                let _permit = permit;
                let output = process_batch(&extractor, &documents[range]);
                tracing::debug!(batch = id, records = output.records.len(), "Batch complete");
                (id, output)
            });
        }

        let mut outputs = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            outputs.push(joined.map_err(|e| BatchError::Worker(e.to_string()))?);
        }
        outputs.sort_by_key(|(id, _)| *id);
        Ok(outputs.into_iter().map(|(_, output)| output).collect())
    }
}

/// Scoped threads pulling batch ids from a shared counter
fn run_threads(
    extractor: &DocumentExtractor,
    documents: &[Candidate],
    batches: &[Range<usize>],
    workers: usize,
) -> Result<Vec<BatchOutput>, BatchError> {
    let next = AtomicUsize::new(0);

    let mut outputs: Vec<(usize, BatchOutput)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.min(batches.len()))
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let id = next.fetch_add(1, Ordering::Relaxed);
                        let Some(range) = batches.get(id) else {
                            break;
                        };
                        let output = process_batch(extractor, &documents[range.clone()]);
                        tracing::debug!(batch = id, records = output.records.len(), "Batch complete");
                        done.push((id, output));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|payload| BatchError::Worker(panic_message(payload.as_ref())))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|per_worker| per_worker.into_iter().flatten().collect())
    })?;

    outputs.sort_by_key(|(id, _)| *id);
    Ok(outputs.into_iter().map(|(_, output)| output).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Arc<DocumentExtractor> {
        Arc::new(DocumentExtractor::default_config().unwrap())
    }

    fn missing(name: &str) -> Candidate {
        Candidate::new(format!("/nonexistent/pmda/{}", name), ContentDigest::of(b""))
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_missing_document_is_a_read_error() {
        let output = process_batch(&extractor(), &[missing("x.xml")]);
        assert!(output.records.is_empty());
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].stage, ErrorStage::Read);
    }

    #[test]
    fn test_document_changed_after_dedup_is_a_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("moving.xml");
        std::fs::write(&path, "<PackInsDoc/>").unwrap();

        let outcome = crate::digest::deduplicate(&[path.clone()]);
        std::fs::write(&path, "<PackInsDoc><Other/></PackInsDoc>").unwrap();

        let output = process_batch(&extractor(), &outcome.unique);
        assert!(output.records.is_empty());
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].filename, "moving.xml");
        assert_eq!(output.errors[0].stage, ErrorStage::Read);
        assert!(output.errors[0].message.contains("changed"));
    }

    #[tokio::test]
    async fn test_empty_pools() {
        for kind in [PoolKind::Threads, PoolKind::Tasks] {
            let pool = WorkerPool::new(kind, 3);
            let outputs = pool
                .run(extractor(), Arc::new(Vec::new()), Vec::new())
                .await
                .unwrap();
            assert!(outputs.is_empty());
        }
    }

    #[tokio::test]
    async fn test_outputs_in_batch_order() {
        let documents: Vec<Candidate> = (0..6).map(|i| missing(&format!("{}.xml", i))).collect();
        let batches = vec![0..2, 2..4, 4..6];

        for kind in [PoolKind::Threads, PoolKind::Tasks] {
            let pool = WorkerPool::new(kind, 2);
            let outputs = pool
                .run(extractor(), Arc::new(documents.clone()), batches.clone())
                .await
                .unwrap();

            let names: Vec<String> = outputs
                .iter()
                .flat_map(|o| o.errors.iter().map(|e| e.filename.clone()))
                .collect();
            assert_eq!(names, vec!["0.xml", "1.xml", "2.xml", "3.xml", "4.xml", "5.xml"]);
        }
    }

    #[test]
    fn test_pool_has_at_least_one_worker() {
        assert_eq!(WorkerPool::new(PoolKind::Threads, 0).workers(), 1);
    }
}
