//! Structure Walker
//!
//! One depth-first pass over the document locates every subtree the category
//! extractors need, the product nodes, the essential-field anchors and the
//! free-standing dosage mentions. Extractors then work on these subtrees only
//! and never re-scan the whole document.
//!
//! Unknown elements are descended into and otherwise ignored; nothing the
//! walker meets is an error.

use pmda_domain::Category;
use roxmltree::Node;
use std::collections::BTreeMap;

use crate::markup::{flatten, Markup};

/// Phrase that marks a dosage statement anywhere in the document
pub(crate) const DOSAGE_PHRASE: &str = "用法・用量";

/// How an extractor should read a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Nested header/detail blocks read by the condition-path resolver
    Plain,
    /// Serious adverse events container
    Serious,
    /// Any other adverse events container
    NonSerious,
    /// Per-drug combination table (name, symptoms, mechanism)
    DrugCombinations,
    /// Dosage block, offered to the protocol-table detector first
    DoseAdmin,
    /// Therapeutic classification read as an indication
    Classification,
    /// Composition table of one or more products
    CompositionTable,
    /// Physicochemistry of active ingredients
    Physchem,
}

const SECTION_ROOTS: &[(&str, Category, SectionKind)] = &[
    ("IndicationsOrEfficacy", Category::Indications, SectionKind::Plain),
    ("TherapeuticClassification", Category::Indications, SectionKind::Classification),
    ("InfoDoseAdmin", Category::Dosage, SectionKind::DoseAdmin),
    ("ContraIndications", Category::Contraindications, SectionKind::Plain),
    ("ContraIndicatedCombinations", Category::Contraindications, SectionKind::DrugCombinations),
    ("Warnings", Category::Warnings, SectionKind::Plain),
    ("ImportantPrecautions", Category::Warnings, SectionKind::Plain),
    ("PrecautionsForApplication", Category::Warnings, SectionKind::Plain),
    ("PrecautionsForHandling", Category::Warnings, SectionKind::Plain),
    ("UseInSpecificPopulations", Category::Warnings, SectionKind::Plain),
    ("SeriousAdverseEvents", Category::AdverseEvents, SectionKind::Serious),
    ("OtherAdverseEvents", Category::AdverseEvents, SectionKind::NonSerious),
    ("PrecautionsCombinations", Category::Interactions, SectionKind::DrugCombinations),
    ("DrugInteractions", Category::Interactions, SectionKind::Plain),
    ("CompositionTable", Category::Composition, SectionKind::CompositionTable),
    ("PhyschemOfActIngredientsSection", Category::ActiveIngredients, SectionKind::Physchem),
];

/// Whether elements with this local name start their own section
///
/// The resolver stops at nested section roots so each subtree is read by
/// exactly one section.
pub(crate) fn is_section_root(local: &str) -> bool {
    SECTION_ROOTS.iter().any(|(name, _, _)| *name == local)
}

fn section_for(local: &str) -> Option<(Category, SectionKind)> {
    SECTION_ROOTS
        .iter()
        .find(|(name, _, _)| *name == local)
        .map(|(_, category, kind)| (*category, *kind))
}

/// One located subtree
#[derive(Debug, Clone)]
pub struct Section<'a, 'i> {
    /// How to read it
    pub kind: SectionKind,
    /// Section root element
    pub node: Node<'a, 'i>,
    /// `ref` of the nearest enclosing per-product block, if any
    pub product_ref: Option<String>,
}

/// Nodes holding essential fields, first occurrence wins
#[derive(Debug, Clone, Default)]
pub struct Anchors<'a, 'i> {
    /// `PackageInsertNo`
    pub package_insert_no: Option<Node<'a, 'i>>,
    /// `TherapeuticClassification`
    pub therapeutic_classification: Option<Node<'a, 'i>>,
    /// `CompanyIdentifier`
    pub company_identifier: Option<Node<'a, 'i>>,
    /// `NameAddressManufact/Manufacturer`, all of them
    pub manufacturers: Vec<Node<'a, 'i>>,
    /// `PropertyTable`, with the enclosing product ref
    pub property_tables: Vec<(Node<'a, 'i>, Option<String>)>,
    /// `PropertyForConstituentUnits`
    pub constituent_properties: Vec<Node<'a, 'i>>,
}

/// Everything the walker located in one document
#[derive(Debug, Clone, Default)]
pub struct DocumentMap<'a, 'i> {
    /// Sections per category, each list in document order
    pub sections: BTreeMap<Category, Vec<Section<'a, 'i>>>,
    /// `DetailBrandName` nodes, one per product
    pub products: Vec<Node<'a, 'i>>,
    /// Essential-field anchors
    pub anchors: Anchors<'a, 'i>,
    /// Configured-language texts outside `InfoDoseAdmin` that mention dosage, in document order
    pub dosage_mentions: Vec<String>,
    /// Elements visited by the walk
    pub nodes_visited: usize,
}

impl<'a, 'i> DocumentMap<'a, 'i> {
    /// Sections registered for a category
    pub fn sections(&self, category: Category) -> &[Section<'a, 'i>] {
        self.sections
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Ancestry facts carried down the walk
#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    in_manufact: bool,
    in_dose_admin: bool,
}

/// Single-pass locator of extraction-relevant subtrees
#[derive(Debug, Clone, Copy)]
pub(crate) struct StructureWalker<'c> {
    markup: Markup<'c>,
}

impl<'c> StructureWalker<'c> {
    pub(crate) fn new(markup: Markup<'c>) -> Self {
        Self { markup }
    }

    pub(crate) fn walk<'a, 'i>(&self, root: Node<'a, 'i>) -> DocumentMap<'a, 'i> {
        let mut map = DocumentMap::default();
        let mut stack: Vec<(Node<'a, 'i>, Option<String>, Flags)> =
            vec![(root, None, Flags::default())];

        while let Some((node, product_ref, flags)) = stack.pop() {
            if !self.markup.in_scope(node) {
                continue;
            }
            map.nodes_visited += 1;
            let local = node.tag_name().name();

            if !flags.in_dose_admin && self.markup.is_text_lang(node) {
                let text = flatten(node);
                let text = text.trim();
                if text.contains(DOSAGE_PHRASE) {
                    map.dosage_mentions.push(text.to_string());
                }
            }

            if let Some((category, kind)) = section_for(local) {
                map.sections.entry(category).or_default().push(Section {
                    kind,
                    node,
                    product_ref: product_ref.clone(),
                });
            }
            self.record_anchor(&mut map, node, local, &product_ref, flags.in_manufact);

            let scope_ref = match node.attribute("ref") {
                Some(r) if local.ends_with("ForBrand") => Some(r.to_string()),
                _ => product_ref,
            };
            let flags = Flags {
                in_manufact: flags.in_manufact || local == "NameAddressManufact",
                in_dose_admin: flags.in_dose_admin || local == "InfoDoseAdmin",
            };

            // Reverse so children pop in document order
            let children: Vec<_> = node.children().filter(|c| c.is_element()).collect();
            for child in children.into_iter().rev() {
                stack.push((child, scope_ref.clone(), flags));
            }
        }

        tracing::trace!(
            nodes = map.nodes_visited,
            sections = map.sections.values().map(Vec::len).sum::<usize>(),
            products = map.products.len(),
            "Document walked"
        );
        map
    }

    fn record_anchor<'a, 'i>(
        &self,
        map: &mut DocumentMap<'a, 'i>,
        node: Node<'a, 'i>,
        local: &str,
        product_ref: &Option<String>,
        in_manufact: bool,
    ) {
        let anchors = &mut map.anchors;
        match local {
            "DetailBrandName" => map.products.push(node),
            "PackageInsertNo" => {
                anchors.package_insert_no.get_or_insert(node);
            }
            "TherapeuticClassification" => {
                anchors.therapeutic_classification.get_or_insert(node);
            }
            "CompanyIdentifier" => {
                anchors.company_identifier.get_or_insert(node);
            }
            "Manufacturer" if in_manufact => anchors.manufacturers.push(node),
            "PropertyTable" => anchors.property_tables.push((node, product_ref.clone())),
            "PropertyForConstituentUnits" => anchors.constituent_properties.push(node),
            _ => {}
        }
    }
}
