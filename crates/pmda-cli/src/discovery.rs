//! Input directory resolution and candidate discovery.

use crate::error::{CliError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Prefix of dated PMDA export directories.
pub const EXPORT_PREFIX: &str = "pmda_all_";

/// Subdirectory holding the markup documents of an export.
pub const DOCUMENT_SUBDIR: &str = "SGML_XML";

/// Extensions treated as package-insert documents.
pub const DOCUMENT_EXTENSIONS: [&str; 2] = ["xml", "sgml"];

/// Whether `name` looks like `pmda_all_YYYYMMDD`.
pub fn is_export_name(name: &str) -> bool {
    name.strip_prefix(EXPORT_PREFIX)
        .is_some_and(|date| date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()))
}

/// Dated export directories directly under `base`, sorted by name.
pub fn find_export_directories(base: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_export_name) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// The single export directory under `base`.
pub fn auto_detect(base: &Path) -> Result<PathBuf> {
    let mut found = find_export_directories(base)?;
    match found.len() {
        0 => Err(CliError::InvalidInput(format!(
            "no {}YYYYMMDD directory found in {}; pass --input",
            EXPORT_PREFIX,
            base.display()
        ))),
        1 => Ok(found.remove(0)),
        _ => {
            let names: Vec<String> = found
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            Err(CliError::InvalidInput(format!(
                "multiple export directories found ({}); pass --input",
                names.join(", ")
            )))
        }
    }
}

/// Directory to walk for `input`: its `SGML_XML` subdirectory when present.
pub fn document_root(input: &Path) -> Result<PathBuf> {
    if !input.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "input directory does not exist: {}",
            input.display()
        )));
    }

    let nested = input.join(DOCUMENT_SUBDIR);
    if nested.is_dir() {
        Ok(nested)
    } else {
        Ok(input.to_path_buf())
    }
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// All candidate documents under `root`, recursively, sorted by path.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_document(p))
        .collect();

    candidates.sort();
    tracing::debug!(root = %root.display(), count = candidates.len(), "discovered documents");
    candidates
}
