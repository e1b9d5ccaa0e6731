//! Content identity and deduplication
//!
//! Documents are identified by the SHA-256 digest of their bytes. Among
//! files sharing a digest the first in discovery order is kept, so the
//! surviving set is the same on every run over the same candidates.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{DocumentError, ErrorStage};

/// Fixed-size fingerprint of a document's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Digest of a byte slice
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A document that survived deduplication, with the digest it had then
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Location on disk
    pub path: PathBuf,
    /// Digest of the bytes read during deduplication
    pub digest: ContentDigest,
}

impl Candidate {
    /// Pair a path with the digest of its content
    pub fn new(path: impl Into<PathBuf>, digest: ContentDigest) -> Self {
        Self {
            path: path.into(),
            digest,
        }
    }
}

/// Candidates after content deduplication
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Distinct documents, in discovery order
    pub unique: Vec<Candidate>,
    /// Files dropped because an earlier file had the same content
    pub duplicates: usize,
    /// Files that could not be read
    pub unreadable: Vec<DocumentError>,
}

/// File name of a document, for reports
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Keep the first file of every distinct content
///
/// Unreadable files are reported and excluded; they never fail the run.
pub fn deduplicate(candidates: &[PathBuf]) -> DedupOutcome {
    let mut seen = HashSet::new();
    let mut outcome = DedupOutcome::default();

    for path in candidates {
        match std::fs::read(path) {
            Ok(bytes) => {
                let digest = ContentDigest::of(&bytes);
                if seen.insert(digest) {
                    outcome.unique.push(Candidate::new(path.clone(), digest));
                } else {
                    tracing::debug!(path = %path.display(), %digest, "Duplicate content discarded");
                    outcome.duplicates += 1;
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Unreadable file: {}", e);
                outcome
                    .unreadable
                    .push(DocumentError::new(display_name(path), ErrorStage::Read, e.to_string()));
            }
        }
    }

    outcome
}
