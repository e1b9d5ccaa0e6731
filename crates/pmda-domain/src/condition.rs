//! Condition paths and the FactLines built from them
//!
//! A [`ConditionPath`] is an immutable value: descending into a nested block
//! produces a new path with [`ConditionPath::child`], so a label pushed for one
//! subtree is never visible to its siblings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between path labels and leaf text
///
/// Labels and text containing the delimiter are kept verbatim; no escaping is
/// applied, so such lines cannot be split back unambiguously.
pub const PATH_DELIMITER: char = ':';

/// Ordered condition labels accumulated while descending nested blocks
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConditionPath {
    labels: Vec<String>,
}

impl ConditionPath {
    /// The empty path
    pub fn root() -> Self {
        Self::default()
    }

    /// Path extended by one label, leaving `self` untouched
    pub fn child(&self, label: impl Into<String>) -> Self {
        let mut labels = self.labels.clone();
        labels.push(label.into());
        Self { labels }
    }

    /// Labels from outermost to innermost
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels
    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    /// True when no label has been pushed
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for ConditionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", PATH_DELIMITER)?;
            }
            f.write_str(label)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ConditionPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single flattened fact: condition path plus verbatim leaf text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactLine(String);

impl FactLine {
    /// Join `path` and `text`; an empty path yields the bare text
    pub fn new(path: &ConditionPath, text: &str) -> Self {
        Self(compose(None, path, text))
    }

    /// Like [`FactLine::new`] but with `tag` ahead of every path label
    pub fn tagged(tag: &str, path: &ConditionPath, text: &str) -> Self {
        Self(compose(Some(tag), path, text))
    }

    /// Wrap already-composed text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The composed line
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the composed line
    pub fn into_string(self) -> String {
        self.0
    }

    /// True for a line with no content at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn compose(tag: Option<&str>, path: &ConditionPath, text: &str) -> String {
    let segments = tag
        .into_iter()
        .chain(path.labels().iter().map(String::as_str))
        .chain(Some(text).filter(|t| !t.is_empty()));

    let mut out = String::new();
    for (i, segment) in segments.enumerate() {
        if i > 0 {
            out.push(PATH_DELIMITER);
        }
        out.push_str(segment);
    }
    out
}

impl fmt::Display for FactLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FactLine {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
