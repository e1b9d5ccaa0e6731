//! Medicine records - the output unit of the pipeline

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::composition::CompositionEntry;
use crate::condition::FactLine;
use crate::ingredient::ActiveIngredientDetail;

/// Identifying fields of one product
///
/// Missing values are empty strings, never omitted, so every record has the
/// same key set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssentialFields {
    /// YJ code of the product
    pub yj_code: String,

    /// Package insert number
    pub package_insert_no: String,

    /// Therapeutic classification text
    pub therapeutic_classification: String,

    /// Approved brand name
    pub product_name: String,

    /// Dosage-form description
    pub form: String,

    /// Manufacturer identifier
    pub manufacturer_code: String,

    /// Manufacturer name
    pub manufacturer_name: String,

    /// File the record was extracted from
    pub source_filename: String,
}

/// Per-category clinical information of one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClinicalInfo {
    /// Indications or efficacy
    pub indications: Vec<FactLine>,
    /// Dosage and administration
    pub dosage: Vec<FactLine>,
    /// Contraindications
    pub contraindications: Vec<FactLine>,
    /// Warnings and precautions
    pub warnings: Vec<FactLine>,
    /// Adverse events, severity tag first
    pub adverse_events: Vec<FactLine>,
    /// Drug interactions
    pub interactions: Vec<FactLine>,
    /// Ingredients and additives
    pub compositions: Vec<CompositionEntry>,
    /// Active-ingredient physicochemistry
    pub active_ingredients: Vec<ActiveIngredientDetail>,
}

impl ClinicalInfo {
    /// FactLines of a text category; structured categories yield an empty slice
    pub fn facts(&self, category: Category) -> &[FactLine] {
        match category {
            Category::Indications => &self.indications,
            Category::Dosage => &self.dosage,
            Category::Contraindications => &self.contraindications,
            Category::Warnings => &self.warnings,
            Category::AdverseEvents => &self.adverse_events,
            Category::Interactions => &self.interactions,
            Category::Composition | Category::ActiveIngredients => &[],
        }
    }

    /// Mutable FactLines of a text category
    pub fn facts_mut(&mut self, category: Category) -> Option<&mut Vec<FactLine>> {
        match category {
            Category::Indications => Some(&mut self.indications),
            Category::Dosage => Some(&mut self.dosage),
            Category::Contraindications => Some(&mut self.contraindications),
            Category::Warnings => Some(&mut self.warnings),
            Category::AdverseEvents => Some(&mut self.adverse_events),
            Category::Interactions => Some(&mut self.interactions),
            Category::Composition | Category::ActiveIngredients => None,
        }
    }

    /// Number of entries held for a category
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Composition => self.compositions.len(),
            Category::ActiveIngredients => self.active_ingredients.len(),
            text => self.facts(text).len(),
        }
    }

    /// Whether the category holds at least one entry
    pub fn has(&self, category: Category) -> bool {
        self.count(category) > 0
    }

    /// Whether every text category holds at least one FactLine
    pub fn has_all_text(&self) -> bool {
        Category::TEXT.iter().all(|c| self.has(*c))
    }
}

/// One extracted product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MedicineRecord {
    /// Essential fields, serialized first and flat
    #[serde(flatten)]
    pub essentials: EssentialFields,

    /// Clinical information block
    pub clinical_info: ClinicalInfo,
}
