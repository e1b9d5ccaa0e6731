//! Namespace- and language-aware access to package-insert markup

use roxmltree::{Node, NodeType};

use crate::config::ExtractorConfig;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Processing instruction that marks a line break inside text
const LINE_BREAK_PI: &str = "enter";

/// Subtrees that never contribute text
const OPAQUE_ELEMENTS: &[&str] = &["StructuralFormula"];

/// What an element's `Header` says about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HeaderText {
    /// Short enough to act as a condition label
    Label(String),
    /// Too long (or too short) to be a label; kept as content
    Content(String),
}

/// Element lookup bound to one namespace and one text language
#[derive(Debug, Clone, Copy)]
pub(crate) struct Markup<'c> {
    namespace: &'c str,
    language: &'c str,
    max_header_chars: usize,
}

impl<'c> Markup<'c> {
    pub(crate) fn new(config: &'c ExtractorConfig) -> Self {
        Self {
            namespace: &config.namespace,
            language: &config.language,
            max_header_chars: config.max_header_chars,
        }
    }

    /// Elements without a namespace are accepted alongside the configured one
    pub(crate) fn in_scope(&self, node: Node) -> bool {
        node.is_element()
            && node
                .tag_name()
                .namespace()
                .map_or(true, |ns| ns == self.namespace)
    }

    pub(crate) fn is(&self, node: Node, local: &str) -> bool {
        self.in_scope(node) && node.tag_name().name() == local
    }

    pub(crate) fn child<'a, 'i>(&self, node: Node<'a, 'i>, local: &str) -> Option<Node<'a, 'i>> {
        node.children().find(|c| self.is(*c, local))
    }

    pub(crate) fn children<'a, 'i>(&self, node: Node<'a, 'i>, local: &str) -> Vec<Node<'a, 'i>> {
        node.children().filter(|c| self.is(*c, local)).collect()
    }

    /// Descendants (excluding `node`) with the given local name, in document order
    pub(crate) fn descendants<'a, 'i>(&self, node: Node<'a, 'i>, local: &str) -> Vec<Node<'a, 'i>> {
        node.descendants()
            .skip(1)
            .filter(|d| self.is(*d, local))
            .collect()
    }

    /// Follow a chain of child names
    pub(crate) fn path<'a, 'i>(&self, node: Node<'a, 'i>, steps: &[&str]) -> Option<Node<'a, 'i>> {
        steps
            .iter()
            .try_fold(node, |current, step| self.child(current, step))
    }

    fn is_language(&self, lang: Node) -> bool {
        lang.attribute((XML_NAMESPACE, "lang"))
            .map_or(true, |value| value == self.language)
    }

    /// A `Lang` element in the configured language
    pub(crate) fn is_text_lang(&self, node: Node) -> bool {
        self.is(node, "Lang") && self.is_language(node)
    }

    /// Flattened text of the first non-empty `Lang` child in the configured language
    pub(crate) fn lang_text(&self, node: Node) -> Option<String> {
        node.children()
            .filter(|c| self.is_text_lang(*c))
            .map(|lang| flatten(lang).trim().to_string())
            .find(|text| !text.is_empty())
    }

    /// `lang_text` at the end of a child chain
    pub(crate) fn text_at(&self, node: Node, steps: &[&str]) -> Option<String> {
        self.path(node, steps).and_then(|n| self.lang_text(n))
    }

    /// Plain (unflattened) text at the end of a child chain, for code-like fields
    pub(crate) fn value_at(&self, node: Node, steps: &[&str]) -> Option<String> {
        self.path(node, steps)
            .map(|n| flatten(n).trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Every configured-language `Lang` below `node`, flattened and concatenated
    pub(crate) fn cell_text(&self, node: Node) -> String {
        let mut out = String::new();
        for lang in node.descendants().filter(|d| self.is_text_lang(*d)) {
            out.push_str(&flatten(lang));
        }
        out.trim().to_string()
    }

    /// Classify the element's direct `Header`
    ///
    /// Labels wrapped in 〈〉 lose the brackets and must keep more than two
    /// characters; other labels need 2 characters up to the configured bound.
    pub(crate) fn header(&self, node: Node) -> Option<HeaderText> {
        let text = self.text_at(node, &["Header"])?;

        if text.contains('〈') && text.contains('〉') {
            let stripped: String = text.chars().filter(|c| !matches!(c, '〈' | '〉')).collect();
            let stripped = stripped.trim();
            return Some(if stripped.chars().count() > 2 {
                HeaderText::Label(stripped.to_string())
            } else {
                HeaderText::Content(text)
            });
        }

        let len = text.chars().count();
        Some(if len > 1 && len < self.max_header_chars {
            HeaderText::Label(text)
        } else {
            HeaderText::Content(text)
        })
    }
}

/// Concatenate all text below `node`
///
/// Inline markup (sub/superscript, italics, references) contributes its text
/// in place, `<?enter?>` becomes `\n`, opaque subtrees are skipped.
pub(crate) fn flatten(node: Node) -> String {
    let mut out = String::new();
    push_flat(node, &mut out);
    out
}

fn push_flat(node: Node, out: &mut String) {
    for child in node.children() {
        match child.node_type() {
            NodeType::Text => out.push_str(child.text().unwrap_or_default()),
            NodeType::PI => {
                if child.pi().is_some_and(|pi| pi.target == LINE_BREAK_PI) {
                    out.push('\n');
                }
            }
            NodeType::Element => {
                if !OPAQUE_ELEMENTS.contains(&child.tag_name().name()) {
                    push_flat(child, out);
                }
            }
            _ => {}
        }
    }
}
