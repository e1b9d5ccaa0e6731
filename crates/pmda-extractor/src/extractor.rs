//! Document extraction entry point

use pmda_domain::MedicineRecord;

use crate::assembler::RecordAssembler;
use crate::config::ExtractorConfig;
use crate::detector::ProtocolTableDetector;
use crate::error::ExtractorError;
use crate::extractors::{ExtractionContext, Patterns};
use crate::markup::Markup;
use crate::walker::StructureWalker;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Records and walk statistics of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentExtraction {
    /// One record per product, in document order
    pub records: Vec<MedicineRecord>,
    /// Elements visited by the structure walk
    pub nodes_visited: usize,
}

/// Turns one package-insert document into medicine records
///
/// The extractor holds only compiled patterns and configuration, so one
/// instance can be shared by any number of worker threads.
///
/// # Examples
///
/// ```
/// use pmda_extractor::{DocumentExtractor, ExtractorConfig};
///
/// let extractor = DocumentExtractor::new(ExtractorConfig::default()).unwrap();
/// let xml = r#"<PackInsDoc xmlns="http://info.pmda.go.jp/namespace/prescription_drugs/package_insert/1.0">
///   <DetailBrandName id="BRD_Drug1">
///     <ApprovalBrandName><Lang xml:lang="ja">サンプル錠10mg</Lang></ApprovalBrandName>
///   </DetailBrandName>
/// </PackInsDoc>"#;
///
/// let extraction = extractor.extract("sample.xml", xml.as_bytes()).unwrap();
/// assert_eq!(extraction.records.len(), 1);
/// assert_eq!(extraction.records[0].essentials.product_name, "サンプル錠10mg");
/// ```
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    config: ExtractorConfig,
    detector: ProtocolTableDetector,
    patterns: Patterns,
}

impl DocumentExtractor {
    /// Create an extractor; fails on invalid configuration
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            config,
            detector: ProtocolTableDetector::new()?,
            patterns: Patterns::new()?,
        })
    }

    /// Create an extractor with default configuration
    pub fn default_config() -> Result<Self, ExtractorError> {
        Self::new(ExtractorConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract every product record from a document's bytes
    ///
    /// # Errors
    ///
    /// Returns an error when the bytes are not UTF-8 or not well-formed
    /// markup. Missing sections are not errors.
    pub fn extract(&self, filename: &str, bytes: &[u8]) -> Result<DocumentExtraction, ExtractorError> {
        let text = std::str::from_utf8(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes))?;
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let document = roxmltree::Document::parse_with_options(text, options)?;

        let ctx = ExtractionContext {
            markup: Markup::new(&self.config),
            detector: &self.detector,
            patterns: &self.patterns,
            config: &self.config,
        };

        let map = StructureWalker::new(ctx.markup).walk(document.root_element());
        let records = RecordAssembler::new(&ctx).assemble(&map, filename);

        tracing::debug!(
            filename,
            records = records.len(),
            nodes = map.nodes_visited,
            "Document extracted"
        );

        Ok(DocumentExtraction {
            records,
            nodes_visited: map.nodes_visited,
        })
    }
}
