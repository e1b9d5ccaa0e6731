//! Record Assembler
//!
//! Builds one [`MedicineRecord`] per product node. Clinical text is shared by
//! every product of a document; composition is scoped to the product when
//! the document carries per-product composition blocks.

use pmda_domain::{
    ActiveIngredientDetail, Category, ClinicalInfo, CompositionEntry, CompositionKind,
    EssentialFields, FactLine, MedicineRecord,
};
use roxmltree::Node;
use std::collections::HashSet;

use crate::extractors::{extractor_for, CategoryOutput, ExtractionContext};
use crate::markup::flatten;
use crate::walker::{DocumentMap, Section};

/// Phrases marking appearance categories of constituent-unit properties
const APPEARANCE_MARKERS: &[&str] = &["外観", "性状"];

/// Phrase marking the dosage-form category of a property table
const FORM_MARKER: &str = "剤形";

pub(crate) struct RecordAssembler<'c, 'r> {
    ctx: &'c ExtractionContext<'r>,
}

impl<'c, 'r> RecordAssembler<'c, 'r> {
    pub(crate) fn new(ctx: &'c ExtractionContext<'r>) -> Self {
        Self { ctx }
    }

    /// Records for every product in the document, or a single record when none is marked up
    pub(crate) fn assemble(&self, map: &DocumentMap, filename: &str) -> Vec<MedicineRecord> {
        let shared = self.shared_info(map);

        let products: Vec<Option<Node>> = if map.products.is_empty() {
            vec![None]
        } else {
            map.products.iter().copied().map(Some).collect()
        };

        products
            .into_iter()
            .map(|product| {
                let product_id = product.and_then(|p| p.attribute("id"));
                let mut clinical_info = shared.clone();
                clinical_info.compositions = self.compositions(map, product_id);

                MedicineRecord {
                    essentials: self.essentials(map, product, product_id, filename),
                    clinical_info,
                }
            })
            .collect()
    }

    /// Every category except composition, deduplicated
    fn shared_info(&self, map: &DocumentMap) -> ClinicalInfo {
        let mut info = ClinicalInfo::default();

        for category in Category::ALL {
            if category == Category::Composition {
                continue;
            }
            let output = extractor_for(category).extract(self.ctx, map.sections(category), map);
            match output {
                CategoryOutput::Facts(facts) => {
                    if let Some(slot) = info.facts_mut(category) {
                        *slot = dedup_facts(facts);
                    }
                }
                CategoryOutput::Ingredients(details) => {
                    info.active_ingredients = dedup_ingredients(details);
                }
                CategoryOutput::Composition(entries) => {
                    info.compositions = dedup_compositions(entries);
                }
            }
        }
        info
    }

    fn compositions(&self, map: &DocumentMap, product_id: Option<&str>) -> Vec<CompositionEntry> {
        let sections = map.sections(Category::Composition);
        let scoped: Vec<Section> = scoped(sections, product_id, |s| s.product_ref.as_deref())
            .into_iter()
            .cloned()
            .collect();

        match extractor_for(Category::Composition).extract(self.ctx, &scoped, map) {
            CategoryOutput::Composition(entries) => dedup_compositions(entries),
            _ => Vec::new(),
        }
    }

    fn essentials(
        &self,
        map: &DocumentMap,
        product: Option<Node>,
        product_id: Option<&str>,
        filename: &str,
    ) -> EssentialFields {
        let markup = &self.ctx.markup;
        let anchors = &map.anchors;
        let plain = |node: Option<Node>| {
            node.map(|n| flatten(n).trim().to_string())
                .unwrap_or_default()
        };

        let therapeutic_classification = anchors
            .therapeutic_classification
            .and_then(|n| markup.text_at(n, &["Detail"]));

        let manufacturer_name = anchors.manufacturers.iter().find_map(|m| {
            markup
                .descendants(*m, "Name")
                .into_iter()
                .find_map(|n| markup.lang_text(n))
        });

        EssentialFields {
            yj_code: product
                .and_then(|p| markup.value_at(p, &["BrandCode", "YJCode"]))
                .unwrap_or_default(),
            package_insert_no: plain(anchors.package_insert_no),
            product_name: product
                .and_then(|p| markup.text_at(p, &["ApprovalBrandName"]))
                .unwrap_or_default(),
            form: self
                .form(map, product, product_id)
                .or_else(|| therapeutic_classification.clone())
                .unwrap_or_default(),
            therapeutic_classification: therapeutic_classification.unwrap_or_default(),
            manufacturer_code: plain(anchors.company_identifier),
            manufacturer_name: manufacturer_name.unwrap_or_default(),
            source_filename: filename.to_string(),
        }
    }

    /// Dosage form, most specific source first
    fn form(&self, map: &DocumentMap, product: Option<Node>, product_id: Option<&str>) -> Option<String> {
        let markup = &self.ctx.markup;
        let tables: Vec<Node> = scoped(&map.anchors.property_tables, product_id, |(_, r)| r.as_deref())
            .into_iter()
            .map(|(node, _)| *node)
            .collect();

        let formulation_and_tone = tables.iter().find_map(|table| {
            let formulation = markup.text_at(*table, &["Formulation"]);
            let tone = markup.text_at(*table, &["ColorTone"]);
            match (formulation, tone) {
                (Some(f), Some(t)) => Some(format!("{}:{}", f, t)),
                (f, t) => f.or(t),
            }
        });

        let categorized = |property: Node, markers: &[&str]| {
            let category = markup.text_at(property, &["CategoryName"])?;
            if markers.iter().any(|m| category.contains(m)) {
                markup.text_at(property, &["Content", "ContentDetail"])
            } else {
                None
            }
        };

        formulation_and_tone
            .or_else(|| {
                map.anchors.constituent_properties.iter().find_map(|unit| {
                    markup
                        .descendants(*unit, "OtherProperty")
                        .into_iter()
                        .find_map(|p| categorized(p, APPEARANCE_MARKERS))
                })
            })
            .or_else(|| {
                tables.iter().find_map(|table| {
                    markup
                        .children(*table, "OtherProperty")
                        .into_iter()
                        .find_map(|p| categorized(p, &[FORM_MARKER]))
                })
            })
            .or_else(|| product.and_then(|p| markup.text_at(p, &["DosageForm"])))
    }
}

/// Items belonging to the product, or every item when none is tied to it
fn scoped<'s, T>(
    items: &'s [T],
    product_id: Option<&str>,
    product_ref: impl Fn(&T) -> Option<&str>,
) -> Vec<&'s T> {
    if let Some(id) = product_id {
        let own: Vec<&T> = items.iter().filter(|i| product_ref(i) == Some(id)).collect();
        if !own.is_empty() {
            return own;
        }
    }
    items.iter().collect()
}

/// Drop exact repeats, keeping first-occurrence order
pub(crate) fn dedup_facts(facts: Vec<FactLine>) -> Vec<FactLine> {
    let mut seen = HashSet::new();
    facts
        .into_iter()
        .filter(|f| !f.is_empty() && seen.insert(f.clone()))
        .collect()
}

/// Drop repeated (kind, name, amount) triples, and amount-less entries
/// whose (kind, name) also appears with an amount
pub(crate) fn dedup_compositions(entries: Vec<CompositionEntry>) -> Vec<CompositionEntry> {
    let with_amount: HashSet<(CompositionKind, String)> = entries
        .iter()
        .filter(|e| e.has_amount())
        .map(|e| (e.kind.clone(), e.name.clone()))
        .collect();

    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| e.has_amount() || !with_amount.contains(&(e.kind.clone(), e.name.clone())))
        .filter(|e| seen.insert(e.clone()))
        .collect()
}

pub(crate) fn dedup_ingredients(details: Vec<ActiveIngredientDetail>) -> Vec<ActiveIngredientDetail> {
    let mut seen = HashSet::new();
    details
        .into_iter()
        .filter(|d| seen.insert(d.clone()))
        .collect()
}
