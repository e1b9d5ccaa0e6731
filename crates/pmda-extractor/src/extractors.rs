//! Category Extractors
//!
//! A closed set of extractors, one per [`Category`], sharing the
//! [`CategoryExtractor`] capability and dispatched by [`extractor_for`].
//! Each consumes only the sections the walker located for its category.

use pmda_domain::{
    ActiveIngredientDetail, Category, CompositionEntry, CompositionKind, ConditionPath, FactLine,
    Severity,
};
use regex::Regex;
use roxmltree::Node;

use crate::config::ExtractorConfig;
use crate::detector::{LetteredItem, ProtocolTableDetector};
use crate::error::ExtractorError;
use crate::markup::Markup;
use crate::resolver::ConditionResolver;
use crate::walker::{DocumentMap, Section, SectionKind};

/// Additive line ending in an amount, e.g. `ステアリン酸マグネシウム 2.5mg`
const ADDITIVE_AMOUNT: &str =
    r"^(.+?)\s+([\d.]+(?:mg|g|mL|L|％|%|単位|国際単位|IU)(?:/[\w.]+)?)\s*$";

const SYMPTOMS_PREFIX: &str = "Clinical symptoms and measures";
const MECHANISM_PREFIX: &str = "Mechanism and risk factors";

/// Shared, read-only state for one document's extraction
pub(crate) struct ExtractionContext<'r> {
    pub(crate) markup: Markup<'r>,
    pub(crate) detector: &'r ProtocolTableDetector,
    pub(crate) patterns: &'r Patterns,
    pub(crate) config: &'r ExtractorConfig,
}

impl<'r> ExtractionContext<'r> {
    fn resolver(&self) -> ConditionResolver<'r> {
        ConditionResolver::new(self.markup, self.detector)
    }
}

/// Compiled patterns used by the structured extractors
#[derive(Debug, Clone)]
pub(crate) struct Patterns {
    additive_amount: Regex,
}

impl Patterns {
    pub(crate) fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            additive_amount: Regex::new(ADDITIVE_AMOUNT)?,
        })
    }

    /// Split a trailing amount off an additive line
    pub(crate) fn split_additive(&self, item: &str) -> (String, Option<String>) {
        match self.additive_amount.captures(item) {
            Some(caps) => (
                caps.get(1).map_or(item, |m| m.as_str()).trim().to_string(),
                caps.get(2).map(|m| m.as_str().to_string()),
            ),
            None => (item.to_string(), None),
        }
    }
}

/// What one extractor produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CategoryOutput {
    Facts(Vec<FactLine>),
    Composition(Vec<CompositionEntry>),
    Ingredients(Vec<ActiveIngredientDetail>),
}

/// Turn a category's located sections into its output
pub(crate) trait CategoryExtractor: Sync {
    /// Category this extractor fills
    fn category(&self) -> Category;

    /// Extract from `sections`; `map` gives access to document-wide findings
    fn extract(
        &self,
        ctx: &ExtractionContext,
        sections: &[Section],
        map: &DocumentMap,
    ) -> CategoryOutput;
}

struct IndicationsExtractor;
struct DosageExtractor;
struct ContraindicationsExtractor;
struct WarningsExtractor;
struct AdverseEventsExtractor;
struct InteractionsExtractor;
struct CompositionExtractor;
struct ActiveIngredientsExtractor;

/// Extractor registered for a category
pub(crate) fn extractor_for(category: Category) -> &'static dyn CategoryExtractor {
    match category {
        Category::Indications => &IndicationsExtractor,
        Category::Dosage => &DosageExtractor,
        Category::Contraindications => &ContraindicationsExtractor,
        Category::Warnings => &WarningsExtractor,
        Category::AdverseEvents => &AdverseEventsExtractor,
        Category::Interactions => &InteractionsExtractor,
        Category::Composition => &CompositionExtractor,
        Category::ActiveIngredients => &ActiveIngredientsExtractor,
    }
}

impl CategoryExtractor for IndicationsExtractor {
    fn category(&self) -> Category {
        Category::Indications
    }

    fn extract(&self, ctx: &ExtractionContext, sections: &[Section], _map: &DocumentMap) -> CategoryOutput {
        let resolver = ctx.resolver();
        let root = ConditionPath::root();

        // Classification text follows the indications proper
        let (classification, plain): (Vec<&Section>, Vec<&Section>) = sections
            .iter()
            .partition(|s| s.kind == SectionKind::Classification);

        let facts = plain
            .into_iter()
            .chain(classification)
            .flat_map(|s| resolver.resolve(s.node, &root))
            .collect();
        CategoryOutput::Facts(facts)
    }
}

impl CategoryExtractor for DosageExtractor {
    fn category(&self) -> Category {
        Category::Dosage
    }

    fn extract(&self, ctx: &ExtractionContext, sections: &[Section], map: &DocumentMap) -> CategoryOutput {
        let resolver = ctx.resolver().detect_tables(true);
        let root = ConditionPath::root();
        let mut facts = Vec::new();

        for section in sections {
            match ctx.detector.detect_lettered(&ctx.markup, section.node) {
                Some(lettered) => {
                    tracing::debug!(
                        protocols = lettered.protocols().count(),
                        "Lettered dosage protocols detected"
                    );
                    for item in &lettered.items {
                        match item {
                            LetteredItem::Text { path, text } => facts.push(FactLine::new(path, text)),
                            LetteredItem::Protocol { path, protocol } => {
                                facts.extend(protocol.fact_lines(path))
                            }
                            LetteredItem::Table { path, node } => {
                                facts.extend(resolver.resolve_table(*node, path))
                            }
                        }
                    }
                }
                None => facts.extend(resolver.resolve(section.node, &root)),
            }
        }

        facts.extend(map.dosage_mentions.iter().map(|text| FactLine::from_text(text.as_str())));
        CategoryOutput::Facts(facts)
    }
}

impl CategoryExtractor for ContraindicationsExtractor {
    fn category(&self) -> Category {
        Category::Contraindications
    }

    fn extract(&self, ctx: &ExtractionContext, sections: &[Section], _map: &DocumentMap) -> CategoryOutput {
        let resolver = ctx.resolver();
        let root = ConditionPath::root();
        let facts = sections
            .iter()
            .flat_map(|s| match s.kind {
                SectionKind::DrugCombinations => drug_lines(ctx, s.node, None),
                _ => resolver.resolve(s.node, &root),
            })
            .collect();
        CategoryOutput::Facts(facts)
    }
}

impl CategoryExtractor for WarningsExtractor {
    fn category(&self) -> Category {
        Category::Warnings
    }

    fn extract(&self, ctx: &ExtractionContext, sections: &[Section], _map: &DocumentMap) -> CategoryOutput {
        let resolver = ctx.resolver();
        let root = ConditionPath::root();
        CategoryOutput::Facts(
            sections
                .iter()
                .flat_map(|s| resolver.resolve(s.node, &root))
                .collect(),
        )
    }
}

impl CategoryExtractor for AdverseEventsExtractor {
    fn category(&self) -> Category {
        Category::AdverseEvents
    }

    fn extract(&self, ctx: &ExtractionContext, sections: &[Section], _map: &DocumentMap) -> CategoryOutput {
        let root = ConditionPath::root();
        let facts = sections
            .iter()
            .flat_map(|s| {
                let severity = match s.kind {
                    SectionKind::Serious => Severity::Serious,
                    _ => Severity::NonSerious,
                };
                ctx.resolver()
                    .with_tag(severity.tag())
                    .keep_bare_headers(ctx.config.keep_bare_headers)
                    .resolve(s.node, &root)
            })
            .collect();
        CategoryOutput::Facts(facts)
    }
}

impl CategoryExtractor for InteractionsExtractor {
    fn category(&self) -> Category {
        Category::Interactions
    }

    fn extract(&self, ctx: &ExtractionContext, sections: &[Section], _map: &DocumentMap) -> CategoryOutput {
        let resolver = ctx.resolver();
        let root = ConditionPath::root();
        let facts = sections
            .iter()
            .flat_map(|s| match s.kind {
                SectionKind::DrugCombinations => {
                    drug_lines(ctx, s.node, Some((SYMPTOMS_PREFIX, MECHANISM_PREFIX)))
                }
                _ => resolver.resolve(s.node, &root),
            })
            .collect();
        CategoryOutput::Facts(facts)
    }
}

/// Lines of a per-drug combination table
///
/// Direct details of the section come first, then for each drug its name,
/// clinical symptoms and mechanism, optionally prefixed.
fn drug_lines(ctx: &ExtractionContext, section: Node, prefixes: Option<(&str, &str)>) -> Vec<FactLine> {
    let resolver = ctx.resolver();
    let root = ConditionPath::root();
    let markup = &ctx.markup;

    let mut facts: Vec<FactLine> = markup
        .children(section, "Detail")
        .into_iter()
        .filter_map(|d| markup.lang_text(d))
        .map(|text| FactLine::from_text(text))
        .collect();

    let prefixed = |lines: Vec<FactLine>, prefix: Option<&str>| -> Vec<FactLine> {
        match prefix {
            Some(prefix) => lines
                .into_iter()
                .map(|l| FactLine::from_text(format!("{}: {}", prefix, l)))
                .collect(),
            None => lines,
        }
    };

    for drug in markup.descendants(section, "Drug") {
        for name in markup.children(drug, "DrugName") {
            facts.extend(resolver.resolve(name, &root));
        }
        for symptoms in markup.children(drug, "ClinSymptomsAndMeasures") {
            facts.extend(prefixed(resolver.resolve(symptoms, &root), prefixes.map(|p| p.0)));
        }
        for mechanism in markup.children(drug, "MechanismAndRiskFactors") {
            facts.extend(prefixed(resolver.resolve(mechanism, &root), prefixes.map(|p| p.1)));
        }
    }
    facts
}

impl CategoryExtractor for CompositionExtractor {
    fn category(&self) -> Category {
        Category::Composition
    }

    fn extract(&self, ctx: &ExtractionContext, sections: &[Section], _map: &DocumentMap) -> CategoryOutput {
        let markup = &ctx.markup;
        let first_text = |node: Node, local: &str| {
            markup
                .descendants(node, local)
                .into_iter()
                .find_map(|n| markup.lang_text(n))
        };
        let mut entries = Vec::new();

        for table in sections.iter().map(|s| s.node) {
            for contained in markup.descendants(table, "ContainedAmount") {
                if let Some(name) = first_text(contained, "ActiveIngredientName") {
                    entries.push(CompositionEntry::active(name, first_text(contained, "ValueAndUnit")));
                }
            }

            for info in markup.descendants(table, "InfoIndividualAdditive") {
                if let Some(name) = markup.text_at(info, &["IndividualAdditive"]) {
                    let amount = markup.text_at(info, &["ValueAndUnit"]);
                    entries.push(CompositionEntry::additive(name, amount));
                }
            }

            for list in markup.descendants(table, "ListOfAdditives") {
                let Some(text) = markup.lang_text(list) else {
                    continue;
                };
                for item in text.lines().map(str::trim).filter(|i| !i.is_empty()) {
                    let (name, amount) = ctx.patterns.split_additive(item);
                    entries.push(CompositionEntry::additive(name, amount));
                }
            }

            for other in markup.descendants(table, "OtherComposition") {
                let label = first_text(other, "CategoryName").unwrap_or_default();
                let title = first_text(other, "ContentTitle");
                let detail = first_text(other, "ContentDetail");
                let (title, detail) = match (title, detail) {
                    (Some(title), detail) => (title, detail),
                    (None, Some(detail)) => (detail, None),
                    (None, None) => continue,
                };
                entries.push(CompositionEntry::new(CompositionKind::Other(label), title, detail));
            }
        }
        CategoryOutput::Composition(entries)
    }
}

const PHYSCHEM_FIELDS: [&str; 9] = [
    "GeneralName",
    "ChemicalName",
    "MolecularFormula",
    "MolecularWeight",
    "Nature",
    "DescriptionOfActiveIngredients",
    "Solubility",
    "DistributionCoefficient",
    "pKa",
];

impl CategoryExtractor for ActiveIngredientsExtractor {
    fn category(&self) -> Category {
        Category::ActiveIngredients
    }

    fn extract(&self, ctx: &ExtractionContext, sections: &[Section], _map: &DocumentMap) -> CategoryOutput {
        let markup = &ctx.markup;
        let details = sections
            .iter()
            .map(|section| {
                let [general, chemical, formula, weight, nature, description, solubility, distribution, pka] =
                    PHYSCHEM_FIELDS.map(|field| {
                        markup
                            .descendants(section.node, field)
                            .into_iter()
                            .find_map(|n| markup.text_at(n, &["Detail"]))
                    });
                ActiveIngredientDetail {
                    general_name: general.unwrap_or_default(),
                    chemical_name: chemical.unwrap_or_default(),
                    molecular_formula: formula.unwrap_or_default(),
                    molecular_weight: weight.unwrap_or_default(),
                    nature: nature.unwrap_or_default(),
                    description,
                    solubility,
                    distribution_coefficient: distribution,
                    pka,
                }
            })
            .filter(|detail| !detail.is_empty())
            .collect();
        CategoryOutput::Ingredients(details)
    }
}
