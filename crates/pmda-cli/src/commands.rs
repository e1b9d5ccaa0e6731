//! Run modes of the `pmda` binary.

use crate::discovery;
use crate::error::{CliError, Result};
use pmda_batch::{BatchConfig, BatchRunner, RunReport};
use pmda_domain::MedicineRecord;
use pmda_extractor::{DocumentExtractor, ExtractorConfig};
use std::fs;
use std::path::Path;
use tracing::info;

/// Extract one document and render its records as pretty JSON.
///
/// Batching and deduplication are skipped entirely.
pub fn execute_debug_file(path: &Path, extractor_config: ExtractorConfig) -> Result<String> {
    let extractor = DocumentExtractor::new(extractor_config)?;
    let bytes = fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::InvalidInput(format!("not a file: {}", path.display())))?;

    let extraction = extractor.extract(&filename, &bytes)?;
    info!(
        file = %filename,
        records = extraction.records.len(),
        nodes = extraction.nodes_visited,
        "debug extraction complete"
    );
    Ok(serde_json::to_string_pretty(&extraction.records)?)
}

/// Discover the documents under `input` and run the batch pipeline over them.
pub async fn execute_batch(
    input: &Path,
    batch_config: BatchConfig,
    extractor_config: ExtractorConfig,
) -> Result<RunReport> {
    let root = discovery::document_root(input)?;
    let candidates = discovery::discover(&root);
    info!(root = %root.display(), candidates = candidates.len(), "starting run");

    let runner = BatchRunner::new(batch_config, extractor_config)?;
    Ok(runner.run(&candidates).await?)
}

/// Write records as a pretty-printed JSON array, creating parent directories.
pub fn write_records(path: &Path, records: &[MedicineRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    info!(path = %path.display(), records = records.len(), "wrote output");
    Ok(())
}
