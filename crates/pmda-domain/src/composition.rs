//! Composition entries (active ingredients, additives and other components)

use serde::{Serialize, Serializer};
use std::fmt;

use crate::condition::PATH_DELIMITER;

/// Kind of a composition entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompositionKind {
    /// Active ingredient with its contained amount
    Active,
    /// Additive (excipient)
    Additive,
    /// Any other component, labelled by the category name the document gives
    Other(String),
}

impl CompositionKind {
    /// Tag prepended to the serialized entry
    pub fn tag(&self) -> &str {
        match self {
            CompositionKind::Active => "Active ingredient",
            CompositionKind::Additive => "Additive",
            CompositionKind::Other(label) => label,
        }
    }
}

/// One ingredient line of a record's composition
///
/// Serializes as a single string: `"{tag}:{name}"` or `"{tag}:{name}:{amount}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositionEntry {
    /// Entry kind
    pub kind: CompositionKind,
    /// Ingredient name, verbatim
    pub name: String,
    /// Amount with unit, verbatim, when the document gives one
    pub amount: Option<String>,
}

impl CompositionEntry {
    /// Build an entry; an empty amount is treated as absent
    pub fn new(kind: CompositionKind, name: impl Into<String>, amount: Option<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            amount: amount.filter(|a| !a.trim().is_empty()),
        }
    }

    /// Active ingredient shorthand
    pub fn active(name: impl Into<String>, amount: Option<String>) -> Self {
        Self::new(CompositionKind::Active, name, amount)
    }

    /// Additive shorthand
    pub fn additive(name: impl Into<String>, amount: Option<String>) -> Self {
        Self::new(CompositionKind::Additive, name, amount)
    }

    /// Whether the entry carries an amount
    pub fn has_amount(&self) -> bool {
        self.amount.is_some()
    }
}

impl fmt::Display for CompositionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.kind.tag();
        if !tag.is_empty() {
            write!(f, "{}{}", tag, PATH_DELIMITER)?;
        }
        f.write_str(&self.name)?;
        if let Some(amount) = &self.amount {
            write!(f, "{}{}", PATH_DELIMITER, amount)?;
        }
        Ok(())
    }
}

impl Serialize for CompositionEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_amount() {
        let entry = CompositionEntry::active("カペシタビン", Some("300mg".to_string()));
        assert_eq!(entry.to_string(), "Active ingredient:カペシタビン:300mg");
    }

    #[test]
    fn test_display_without_amount() {
        let entry = CompositionEntry::additive("乳糖水和物", None);
        assert_eq!(entry.to_string(), "Additive:乳糖水和物");
    }

    #[test]
    fn test_blank_amount_is_absent() {
        let entry = CompositionEntry::additive("タルク", Some("  ".to_string()));
        assert!(!entry.has_amount());
    }

    #[test]
    fn test_other_kind_uses_its_label() {
        let entry = CompositionEntry::new(
            CompositionKind::Other("pH".to_string()),
            "6.5～7.5",
            None,
        );
        assert_eq!(entry.to_string(), "pH:6.5～7.5");
    }

    #[test]
    fn test_serializes_as_string() {
        let entry = CompositionEntry::active("X", Some("1g".to_string()));
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            "\"Active ingredient:X:1g\""
        );
    }
}
