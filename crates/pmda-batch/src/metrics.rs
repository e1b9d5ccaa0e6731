//! Counters collected during a run

use pmda_domain::{Category, MedicineRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-stage counters of one run
///
/// Tracks discovery, deduplication, scheduling and per-category output, for
/// the caller's reporting layer to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    /// Candidate files handed to the run
    pub files_found: usize,

    /// Candidates that could not be read while fingerprinting
    pub unreadable: usize,

    /// Candidates dropped as content duplicates
    pub duplicates_removed: usize,

    /// Documents that went through extraction successfully
    pub documents_processed: usize,

    /// Documents that failed during extraction
    pub documents_failed: usize,

    /// Records produced
    pub records_produced: usize,

    /// Batches dispatched
    pub batch_count: usize,

    /// Documents per batch
    pub batch_size: usize,

    /// Workers used
    pub workers: usize,

    /// Elements visited by the structure walker, over all documents
    pub nodes_visited: usize,

    /// Entries per category, over all records
    pub facts_per_category: BTreeMap<Category, usize>,

    /// Records holding at least one entry, per category
    pub records_with_category: BTreeMap<Category, usize>,

    /// Records holding every text category
    pub records_with_all_text: usize,

    /// Wall-clock duration of the run (in milliseconds)
    pub elapsed_ms: u64,
}

impl RunMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of discovery and deduplication
    pub fn record_discovery(&mut self, found: usize, unreadable: usize, duplicates: usize) {
        self.files_found += found;
        self.unreadable += unreadable;
        self.duplicates_removed += duplicates;
    }

    /// Record the batch plan
    pub fn record_plan(&mut self, batch_count: usize, batch_size: usize, workers: usize) {
        self.batch_count = batch_count;
        self.batch_size = batch_size;
        self.workers = workers;
    }

    /// Record one successfully extracted document
    pub fn record_document(&mut self, nodes_visited: usize) {
        self.documents_processed += 1;
        self.nodes_visited += nodes_visited;
    }

    /// Record one failed document
    pub fn record_failure(&mut self) {
        self.documents_failed += 1;
    }

    /// Record one produced record
    pub fn record_record(&mut self, record: &MedicineRecord) {
        self.records_produced += 1;
        let info = &record.clinical_info;

        for category in Category::ALL {
            let count = info.count(category);
            *self.facts_per_category.entry(category).or_insert(0) += count;
            if count > 0 {
                *self.records_with_category.entry(category).or_insert(0) += 1;
            }
        }
        if info.has_all_text() {
            self.records_with_all_text += 1;
        }
    }

    /// Get entries extracted for a category
    pub fn facts(&self, category: Category) -> usize {
        self.facts_per_category.get(&category).copied().unwrap_or(0)
    }

    /// Get records carrying a category
    pub fn records_with(&self, category: Category) -> usize {
        self.records_with_category.get(&category).copied().unwrap_or(0)
    }

    /// Get total FactLines across the text categories
    pub fn total_facts(&self) -> usize {
        Category::TEXT.iter().map(|c| self.facts(*c)).sum()
    }

    /// Get total errors, unreadable files included
    pub fn total_errors(&self) -> usize {
        self.unreadable + self.documents_failed
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Run Metrics Summary".to_string(),
            "===================".to_string(),
            format!("Files found: {}", self.files_found),
            format!("Unreadable: {}", self.unreadable),
            format!("Duplicates removed: {}", self.duplicates_removed),
            format!("Documents processed: {}", self.documents_processed),
            format!("Documents failed: {}", self.documents_failed),
            format!("Records produced: {}", self.records_produced),
            format!(
                "Batches: {} x {} documents, {} workers",
                self.batch_count, self.batch_size, self.workers
            ),
            format!("Nodes visited: {}", self.nodes_visited),
            format!("Elapsed: {}ms", self.elapsed_ms),
            String::new(),
        ];

        if self.records_produced > 0 {
            lines.push("Entries by category:".to_string());
            for category in Category::ALL {
                lines.push(format!(
                    "  {}: {} ({} records)",
                    category.as_str(),
                    self.facts(category),
                    self.records_with(category)
                ));
            }
            lines.push(format!("  Total text facts: {}", self.total_facts()));
            lines.push(format!(
                "  Records with all text categories: {}",
                self.records_with_all_text
            ));
        }

        lines.join("\n")
    }
}
