//! Condition-Path Resolver
//!
//! Depth-first descent over nested conditional blocks. Every element with a
//! usable `Header` extends the path for its own subtree only; every `Detail`
//! below emits one FactLine carrying the path accumulated so far.
//!
//! The path travels as an immutable value through the recursion, so sibling
//! subtrees never see each other's labels.

use pmda_domain::{ConditionPath, FactLine};
use roxmltree::Node;

use crate::detector::ProtocolTableDetector;
use crate::markup::{HeaderText, Markup};
use crate::walker::is_section_root;

/// Resolver over one section subtree
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConditionResolver<'r> {
    markup: Markup<'r>,
    detector: &'r ProtocolTableDetector,
    tag: Option<&'r str>,
    keep_bare_headers: bool,
    detect_tables: bool,
}

impl<'r> ConditionResolver<'r> {
    pub(crate) fn new(markup: Markup<'r>, detector: &'r ProtocolTableDetector) -> Self {
        Self {
            markup,
            detector,
            tag: None,
            keep_bare_headers: false,
            detect_tables: false,
        }
    }

    /// Prefix every line with `tag`, ahead of the path
    pub(crate) fn with_tag(mut self, tag: &'r str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Emit a line for a labelled block that produced nothing else
    pub(crate) fn keep_bare_headers(mut self, keep: bool) -> Self {
        self.keep_bare_headers = keep;
        self
    }

    /// Offer tables to the procedure-dosage grammar before reading rows
    pub(crate) fn detect_tables(mut self, detect: bool) -> Self {
        self.detect_tables = detect;
        self
    }

    /// Resolve the children of `section`
    ///
    /// The section's own header is a generic title and is not part of the path.
    pub(crate) fn resolve(&self, section: Node, path: &ConditionPath) -> Vec<FactLine> {
        let mut out = Vec::new();
        self.descend(section, path, &mut out);
        out
    }

    /// Resolve a single table block under `path`
    pub(crate) fn resolve_table(&self, table: Node, path: &ConditionPath) -> Vec<FactLine> {
        let mut out = Vec::new();
        self.table(table, path, &mut out);
        out
    }

    fn line(&self, path: &ConditionPath, text: &str) -> FactLine {
        match self.tag {
            Some(tag) => FactLine::tagged(tag, path, text),
            None => FactLine::new(path, text),
        }
    }

    fn descend(&self, node: Node, path: &ConditionPath, out: &mut Vec<FactLine>) {
        for child in node.children().filter(|c| self.markup.in_scope(*c)) {
            match child.tag_name().name() {
                "Header" => {}
                "Detail" => {
                    if let Some(text) = self.markup.lang_text(child) {
                        out.push(self.line(path, &text));
                    }
                }
                "TblBlock" => self.table(child, path, out),
                local if is_section_root(local) => {}
                _ => self.block(child, path, out),
            }
        }
    }

    fn block(&self, node: Node, path: &ConditionPath, out: &mut Vec<FactLine>) {
        let before = out.len();
        let child_path = match self.markup.header(node) {
            Some(HeaderText::Label(label)) => Some(path.child(label)),
            Some(HeaderText::Content(text)) => {
                out.push(self.line(path, &text));
                None
            }
            None => None,
        };

        match child_path {
            Some(child_path) => {
                self.descend(node, &child_path, out);
                if self.keep_bare_headers && out.len() == before {
                    out.push(self.line(&child_path, ""));
                }
            }
            None => self.descend(node, path, out),
        }
    }

    fn table(&self, node: Node, path: &ConditionPath, out: &mut Vec<FactLine>) {
        let table_path = match self.markup.header(node) {
            Some(HeaderText::Label(label)) => path.child(label),
            Some(HeaderText::Content(text)) => {
                out.push(self.line(path, &text));
                path.clone()
            }
            None => path.clone(),
        };

        let block = self.detector.read_table(&self.markup, node, self.detect_tables);
        tracing::trace!(reading = ?block.reading, "Table block read");
        out.extend(block.fact_lines(&table_path, self.tag));
    }
}
