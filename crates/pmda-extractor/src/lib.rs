//! PMDA Extractor
//!
//! Converts one package-insert document into normalized medicine records.
//!
//! # Overview
//!
//! Package inserts encode the same clinical information with
//! manufacturer-specific nesting, conditional qualifiers and free-text
//! tables. The extractor flattens all of it into path-prefixed FactLines
//! without losing the conditioning context and without rewording anything.
//!
//! # Architecture
//!
//! ```text
//! bytes → parse → Structure Walker → Category Extractors → Record Assembler → records
//!                                     ├─ Condition-Path Resolver
//!                                     └─ Protocol-Table Detector
//! ```
//!
//! - **Structure Walker**: one traversal locates every category subtree,
//!   product node and essential-field anchor.
//! - **Condition-Path Resolver**: nested `Header`/`Detail` blocks become
//!   `label:label:text` lines.
//! - **Protocol-Table Detector**: lettered body-surface-area protocols and
//!   procedure-keyed concentration tables become single normalized lines.
//! - **Category Extractors**: a closed set, one per category.
//! - **Record Assembler**: one record per product, with per-record
//!   composition and ingredient deduplication.
//!
//! # Example Usage
//!
//! ```no_run
//! use pmda_extractor::{DocumentExtractor, ExtractorConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = DocumentExtractor::new(ExtractorConfig::default())?;
//! let bytes = std::fs::read("SGML_XML/4291001F1020_1_01.xml")?;
//! let extraction = extractor.extract("4291001F1020_1_01.xml", &bytes)?;
//!
//! for record in &extraction.records {
//!     println!("{}: {} dosage lines", record.essentials.product_name, record.clinical_info.dosage.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod assembler;
mod config;
mod detector;
mod error;
mod extractor;
mod extractors;
mod markup;
mod resolver;
mod walker;

#[cfg(test)]
mod tests;

pub use config::{ExtractorConfig, PMDA_NAMESPACE};
pub use detector::{BsaBand, ProcedureDosageTable, ProtocolTable, NOTE_PREFIX};
pub use error::ExtractorError;
pub use extractor::{DocumentExtraction, DocumentExtractor};
