//! Category module - the clinical-info sections every record carries

use serde::{Deserialize, Serialize};

/// Clinical-info category of a package insert
///
/// The first six categories are text categories holding FactLines; the last
/// two hold structured entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Indications or efficacy
    Indications,

    /// Dosage and administration
    Dosage,

    /// Contraindications, including contraindicated combinations
    Contraindications,

    /// Warnings and precautions
    Warnings,

    /// Adverse events, tagged by severity
    AdverseEvents,

    /// Drug interactions
    Interactions,

    /// Ingredients and additives with amounts
    #[serde(rename = "compositions")]
    Composition,

    /// Physicochemical properties of active ingredients
    ActiveIngredients,
}

impl Category {
    /// All categories in output order
    pub const ALL: [Category; 8] = [
        Category::Indications,
        Category::Dosage,
        Category::Contraindications,
        Category::Warnings,
        Category::AdverseEvents,
        Category::Interactions,
        Category::Composition,
        Category::ActiveIngredients,
    ];

    /// Categories whose output is a list of FactLines
    pub const TEXT: [Category; 6] = [
        Category::Indications,
        Category::Dosage,
        Category::Contraindications,
        Category::Warnings,
        Category::AdverseEvents,
        Category::Interactions,
    ];

    /// Key of the category inside the `clinical_info` object
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Indications => "indications",
            Category::Dosage => "dosage",
            Category::Contraindications => "contraindications",
            Category::Warnings => "warnings",
            Category::AdverseEvents => "adverse_events",
            Category::Interactions => "interactions",
            Category::Composition => "compositions",
            Category::ActiveIngredients => "active_ingredients",
        }
    }

    /// Parse a category from its output key
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Whether the category produces FactLines
    pub fn is_text(&self) -> bool {
        !matches!(self, Category::Composition | Category::ActiveIngredients)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid category: {}", s))
    }
}

/// Severity of an adverse event, decided by the container it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Sourced from the serious adverse events container
    Serious,
    /// Sourced from any other adverse events container
    NonSerious,
}

impl Severity {
    /// Tag prepended to the FactLine
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Serious => "Serious",
            Severity::NonSerious => "Non-serious",
        }
    }
}
