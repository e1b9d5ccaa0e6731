//! PMDA Domain Layer
//!
//! Data model shared by the extraction engine, the batch pipeline and the
//! command-line front end. Nothing in this crate performs I/O.
//!
//! ## Key Concepts
//!
//! - **FactLine**: one flattened, path-prefixed, verbatim text fact
//! - **ConditionPath**: ordered labels narrowing a fact to a disease/population/regimen context
//! - **CompositionEntry**: an active ingredient or additive with its optional amount
//! - **ActiveIngredientDetail**: physicochemical description of one active ingredient
//! - **MedicineRecord**: essential fields plus the per-category clinical-info block
//!
//! ## Output Shape
//!
//! Records serialize essential fields first, then a `clinical_info` object that
//! always carries one array per category (possibly empty).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod composition;
pub mod condition;
pub mod ingredient;
pub mod record;

// Re-exports for convenience
pub use category::{Category, Severity};
pub use composition::{CompositionEntry, CompositionKind};
pub use condition::{ConditionPath, FactLine, PATH_DELIMITER};
pub use ingredient::ActiveIngredientDetail;
pub use record::{ClinicalInfo, EssentialFields, MedicineRecord};
