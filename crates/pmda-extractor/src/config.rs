//! Configuration for the Extractor

use serde::{Deserialize, Serialize};

/// Namespace of PMDA prescription-drug package inserts
pub const PMDA_NAMESPACE: &str =
    "http://info.pmda.go.jp/namespace/prescription_drugs/package_insert/1.0";

/// Configuration for the document extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Value of `xml:lang` whose `Lang` elements are read
    pub language: String,

    /// Markup namespace; elements from other namespaces are skipped
    pub namespace: String,

    /// Header texts at or above this many characters are content, not labels
    pub max_header_chars: usize,

    /// Emit a line for adverse-event items that carry only a header
    pub keep_bare_headers: bool,
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("language must not be empty".to_string());
        }
        if self.namespace.trim().is_empty() {
            return Err("namespace must not be empty".to_string());
        }
        if self.max_header_chars < 3 {
            return Err("max_header_chars must be at least 3".to_string());
        }
        Ok(())
    }

    /// English-language preset for bilingual documents
    pub fn english() -> Self {
        Self {
            language: "en".to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            language: "ja".to_string(),
            namespace: PMDA_NAMESPACE.to_string(),
            max_header_chars: 200,
            keep_bare_headers: true,
        }
    }
}
