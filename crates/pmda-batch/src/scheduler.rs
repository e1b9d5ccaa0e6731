//! Batch Scheduler
//!
//! Splits the deduplicated document list into contiguous batches. The size
//! is bounded by the memory budget, by the wish to give every worker about
//! four batches, and by the configured minimum and maximum.

use std::ops::Range;

use crate::config::BatchConfig;

/// Batches chosen for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Documents per batch (the last batch may be shorter)
    pub batch_size: usize,
    /// Index ranges into the document list, in dispatch order
    pub batches: Vec<Range<usize>>,
}

impl BatchPlan {
    /// Number of batches
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether there is nothing to dispatch
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Documents per batch for `documents` documents
pub fn batch_size(config: &BatchConfig, documents: usize) -> usize {
    if let Some(size) = config.batch_size {
        return size.max(1);
    }

    let by_memory = (config.memory_limit_mb as f64 / config.estimated_document_mb) as usize;
    let by_workers = (documents / (config.workers.max(1) * 4)).max(config.min_batch_size);

    by_memory
        .min(by_workers)
        .min(config.max_batch_size)
        .max(config.min_batch_size)
}

/// Plan contiguous batches over `documents` documents
pub fn plan(config: &BatchConfig, documents: usize) -> BatchPlan {
    let size = batch_size(config, documents);
    let batches = (0..documents)
        .step_by(size)
        .map(|start| start..(start + size).min(documents))
        .collect();

    BatchPlan {
        batch_size: size,
        batches,
    }
}
