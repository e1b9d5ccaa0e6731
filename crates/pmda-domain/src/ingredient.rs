//! Active-ingredient physicochemistry

use serde::{Deserialize, Serialize};

/// Physicochemical description of one active ingredient
///
/// Every value is the document's text after inline formatting has been
/// flattened. The molecular weight in particular is never parsed, because
/// documents differ in units and precision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveIngredientDetail {
    /// General (non-proprietary) name
    pub general_name: String,

    /// Chemical name
    pub chemical_name: String,

    /// Molecular formula, e.g. `C15H22FN3O6`
    pub molecular_formula: String,

    /// Molecular weight as written
    pub molecular_weight: String,

    /// Nature / appearance
    pub nature: String,

    /// Free-text description of the ingredient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Solubility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solubility: Option<String>,

    /// Distribution coefficient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_coefficient: Option<String>,

    /// Acid dissociation constant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pka: Option<String>,
}

impl ActiveIngredientDetail {
    /// True when no field carries text
    pub fn is_empty(&self) -> bool {
        self.general_name.is_empty()
            && self.chemical_name.is_empty()
            && self.molecular_formula.is_empty()
            && self.molecular_weight.is_empty()
            && self.nature.is_empty()
            && self.description.is_none()
            && self.solubility.is_none()
            && self.distribution_coefficient.is_none()
            && self.pka.is_none()
    }
}
