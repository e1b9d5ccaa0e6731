//! Protocol-Table Detector
//!
//! Two irregular layouts appear inside dosage sections:
//!
//! - **Lettered protocols** (capecitabine-style): free text naming regimens
//!   `A法：…`, `B法：…` followed by one body-surface-area table per regimen.
//! - **Procedure dosage tables** (contrast-agent-style): a table whose first
//!   column names a procedure and whose header names one concentration per
//!   remaining column.
//!
//! Both are pattern sets learned from the existing corpus; new manufacturer
//! variants should come with a regression test in `tests.rs`. Values are
//! never normalized: ranges, units and footnote markers pass through verbatim.

use pmda_domain::{ConditionPath, FactLine};
use regex::Regex;
use roxmltree::Node;

use crate::error::ExtractorError;
use crate::markup::{flatten, HeaderText, Markup};
use crate::walker::is_section_root;

/// Regimen marker, e.g. `A法：`
const PROTOCOL_MARKER: &str = r"([A-F])法[：:]";

/// Header cell naming an agent concentration
const CONCENTRATION: &str = r"(?i)(mgI/mL|[mμ]g/mL|w/v\s*[%％]|m?mol/L|\d\s*[%％])";

/// Cells that mean "not applicable"
const EMPTY_MARKS: &[&str] = &["-", "－", "—", "―", "–", "ー", "‐"];

/// Prefix of table footnote lines
pub const NOTE_PREFIX: &str = "Note";

/// One body-surface-area band of a lettered protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BsaBand {
    /// Band as written, e.g. `1.25m2以上1.50m2未満`
    pub range: String,
    /// (time-of-day label, dose) pairs; the label is empty when the header has none
    pub doses: Vec<(String, String)>,
}

/// A lettered regimen with its body-surface-area table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolTable {
    /// Protocol label, e.g. `A法`
    pub label: String,
    /// Regimen description, verbatim
    pub regimen: String,
    /// Bands of the paired table, empty when no table was paired
    pub bands: Vec<BsaBand>,
    /// Footnotes of the paired table
    pub notes: Vec<String>,
}

impl ProtocolTable {
    /// The protocol line under `path`, then one `Note:` line per footnote
    pub fn fact_lines(&self, path: &ConditionPath) -> Vec<FactLine> {
        std::iter::once(FactLine::new(path, self.to_fact_line().as_str()))
            .chain(
                self.notes
                    .iter()
                    .map(|n| FactLine::new(path, &format!("{}:{}", NOTE_PREFIX, n))),
            )
            .collect()
    }

    /// Render as a single FactLine
    pub fn to_fact_line(&self) -> FactLine {
        let mut line = if self.regimen.is_empty() {
            self.label.clone()
        } else {
            format!("{}:{}", self.label, self.regimen)
        };

        if !self.bands.is_empty() {
            let bands: Vec<String> = self
                .bands
                .iter()
                .map(|band| {
                    let doses: Vec<String> = band
                        .doses
                        .iter()
                        .map(|(time, dose)| {
                            if time.is_empty() {
                                dose.clone()
                            } else {
                                format!("{} {}", time, dose)
                            }
                        })
                        .collect();
                    format!("{}: {}", band.range, doses.join(", "))
                })
                .collect();
            line.push_str(" / BSA ");
            line.push_str(&bands.join("; "));
        }

        FactLine::from_text(line)
    }
}

/// A procedure row of a multi-concentration dosage table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureDosageTable {
    /// Procedure name, verbatim
    pub procedure: String,
    /// (concentration label, dose range) pairs
    pub entries: Vec<(String, String)>,
}

impl ProcedureDosageTable {
    /// Render as `procedure:conc dose/conc dose`
    pub fn render(&self) -> String {
        let entries: Vec<String> = self
            .entries
            .iter()
            .map(|(concentration, dose)| {
                if concentration.is_empty() {
                    dose.clone()
                } else {
                    format!("{} {}", concentration, dose)
                }
            })
            .collect();

        match (self.procedure.is_empty(), entries.is_empty()) {
            (false, false) => format!("{}:{}", self.procedure, entries.join("/")),
            (false, true) => self.procedure.clone(),
            (true, _) => entries.join("/"),
        }
    }
}

/// One output unit of a lettered dosage block, in document order
#[derive(Debug, Clone)]
pub enum LetteredItem<'a, 'i> {
    /// Paragraph (or paragraph head) outside any regimen
    Text {
        /// Condition labels enclosing the paragraph
        path: ConditionPath,
        /// Verbatim text
        text: String,
    },
    /// A regimen with its paired table
    Protocol {
        /// Condition labels enclosing the regimen marker
        path: ConditionPath,
        /// Regimen, bands and footnotes
        protocol: ProtocolTable,
    },
    /// Table left over after pairing, read generically
    Table {
        /// Condition labels enclosing the table
        path: ConditionPath,
        /// `TblBlock` element
        node: Node<'a, 'i>,
    },
}

/// Result of the lettered-protocol detector on one dosage block
#[derive(Debug, Clone)]
pub struct LetteredProtocols<'a, 'i> {
    /// Paragraphs, regimens and unpaired tables in document order
    pub items: Vec<LetteredItem<'a, 'i>>,
}

impl LetteredProtocols<'_, '_> {
    /// Regimens found, in text order
    pub fn protocols(&self) -> impl Iterator<Item = &ProtocolTable> {
        self.items.iter().filter_map(|item| match item {
            LetteredItem::Protocol { protocol, .. } => Some(protocol),
            _ => None,
        })
    }
}

/// Leaf of a dosage block with the condition path that encloses it
#[derive(Debug, Clone)]
enum Segment<'a, 'i> {
    Text(ConditionPath, String),
    Table(ConditionPath, Node<'a, 'i>),
}

/// How a table block was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableReading {
    /// Procedure dosage table
    Procedure(Vec<ProcedureDosageTable>),
    /// Neither grammar matched: one line per row, cells joined by ` | `
    Rows(Vec<String>),
}

/// Table block contents plus its footnotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    /// Body of the table
    pub reading: TableReading,
    /// Footnote texts
    pub notes: Vec<String>,
}

impl TableBlock {
    /// FactLines under `path`: body lines first, then `Note:` lines
    pub fn fact_lines(&self, path: &ConditionPath, tag: Option<&str>) -> Vec<FactLine> {
        let body: Vec<String> = match &self.reading {
            TableReading::Procedure(tables) => tables.iter().map(ProcedureDosageTable::render).collect(),
            TableReading::Rows(rows) => rows.clone(),
        };
        body.into_iter()
            .chain(self.notes.iter().map(|n| format!("{}:{}", NOTE_PREFIX, n)))
            .map(|text| match tag {
                Some(tag) => FactLine::tagged(tag, path, &text),
                None => FactLine::new(path, &text),
            })
            .collect()
    }
}

/// Recognizer for the two dosage sub-grammars
#[derive(Debug, Clone)]
pub struct ProtocolTableDetector {
    marker: Regex,
    concentration: Regex,
}

impl ProtocolTableDetector {
    /// Compile the pattern set
    pub fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            marker: Regex::new(PROTOCOL_MARKER)?,
            concentration: Regex::new(CONCENTRATION)?,
        })
    }

    /// Try the lettered-protocol grammar on a dosage block
    ///
    /// Fires when the block's detail text names at least two distinct regimen
    /// letters. A regimen runs from its marker to the next marker in the same
    /// paragraph or to the paragraph end, and keeps the condition labels
    /// enclosing it. The k-th regimen is paired with the k-th table of the
    /// block; paired tables contribute their bands and footnotes.
    pub(crate) fn detect_lettered<'a, 'i>(
        &self,
        markup: &Markup,
        block: Node<'a, 'i>,
    ) -> Option<LetteredProtocols<'a, 'i>> {
        let mut segments = Vec::new();
        collect_segments(markup, block, &ConditionPath::root(), &mut segments);

        let mut letters: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Text(_, text) = segment {
                for caps in self.marker.captures_iter(text) {
                    if let Some(letter) = caps.get(1) {
                        if !letters.iter().any(|l| l == letter.as_str()) {
                            letters.push(letter.as_str().to_string());
                        }
                    }
                }
            }
        }
        if letters.len() < 2 {
            return None;
        }

        let tables: Vec<Node> = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Table(_, node) => Some(*node),
                _ => None,
            })
            .collect();
        let paired = letters.len().min(tables.len());

        let mut seen: Vec<String> = Vec::new();
        let mut items = Vec::new();
        let mut table_index = 0;

        for segment in segments {
            match segment {
                Segment::Text(path, text) => {
                    self.split_regimens(markup, &path, &text, &tables, &mut seen, &mut items);
                }
                Segment::Table(path, node) => {
                    if table_index >= paired {
                        items.push(LetteredItem::Table { path, node });
                    } else if let Some(HeaderText::Content(text)) = markup.header(node) {
                        items.push(LetteredItem::Text { path, text });
                    }
                    table_index += 1;
                }
            }
        }

        Some(LetteredProtocols { items })
    }

    /// Split one paragraph at first-seen regimen markers
    fn split_regimens<'a, 'i>(
        &self,
        markup: &Markup,
        path: &ConditionPath,
        text: &str,
        tables: &[Node<'a, 'i>],
        seen: &mut Vec<String>,
        items: &mut Vec<LetteredItem<'a, 'i>>,
    ) {
        let mut markers: Vec<(String, usize, usize)> = Vec::new();
        for caps in self.marker.captures_iter(text) {
            let (Some(whole), Some(letter)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if !seen.iter().any(|l| l == letter.as_str()) {
                seen.push(letter.as_str().to_string());
                markers.push((letter.as_str().to_string(), whole.start(), whole.end()));
            }
        }

        let head_end = markers.first().map_or(text.len(), |m| m.1);
        let head = text[..head_end].trim();
        if !head.is_empty() {
            items.push(LetteredItem::Text {
                path: path.clone(),
                text: head.to_string(),
            });
        }

        for (k, (letter, _, body_start)) in markers.iter().enumerate() {
            let body_end = markers.get(k + 1).map_or(text.len(), |next| next.1);
            let (bands, notes) = match tables.get(seen_index(seen, letter)) {
                Some(table) => (bsa_bands(&read_rows(markup, *table)), read_notes(markup, *table)),
                None => (Vec::new(), Vec::new()),
            };
            items.push(LetteredItem::Protocol {
                path: path.clone(),
                protocol: ProtocolTable {
                    label: format!("{}法", letter),
                    regimen: text[*body_start..body_end].trim().to_string(),
                    bands,
                    notes,
                },
            });
        }
    }

    /// Read a table block, trying the procedure grammar when `detect` is set
    pub(crate) fn read_table(&self, markup: &Markup, block: Node, detect: bool) -> TableBlock {
        let rows = read_rows(markup, block);
        let notes = read_notes(markup, block);

        let reading = if detect {
            self.procedure_tables(&rows)
                .map(TableReading::Procedure)
                .unwrap_or_else(|| TableReading::Rows(plain_rows(&rows)))
        } else {
            TableReading::Rows(plain_rows(&rows))
        };

        TableBlock { reading, notes }
    }

    fn procedure_tables(&self, rows: &[Vec<String>]) -> Option<Vec<ProcedureDosageTable>> {
        let (header, data) = rows.split_first()?;
        let keyed = header
            .iter()
            .skip(1)
            .any(|cell| self.concentration.is_match(cell));
        if !keyed || data.is_empty() {
            return None;
        }

        let tables = data
            .iter()
            .filter_map(|row| {
                let (procedure, doses) = row.split_first()?;
                let entries: Vec<(String, String)> = doses
                    .iter()
                    .enumerate()
                    .filter(|(_, dose)| !is_empty_cell(dose))
                    .map(|(j, dose)| {
                        let label = header.get(j + 1).cloned().unwrap_or_default();
                        (label, dose.clone())
                    })
                    .collect();
                let table = ProcedureDosageTable {
                    procedure: procedure.clone(),
                    entries,
                };
                (!table.render().is_empty()).then_some(table)
            })
            .collect();
        Some(tables)
    }
}

/// Position of `letter` among the regimens seen so far
fn seen_index(seen: &[String], letter: &str) -> usize {
    seen.iter().position(|l| l == letter).unwrap_or(usize::MAX)
}

/// Details and tables of a dosage block in document order, each with the
/// condition labels enclosing it
fn collect_segments<'a, 'i>(
    markup: &Markup,
    node: Node<'a, 'i>,
    path: &ConditionPath,
    out: &mut Vec<Segment<'a, 'i>>,
) {
    for child in node.children().filter(|c| markup.in_scope(*c)) {
        match child.tag_name().name() {
            "Header" => {}
            "Detail" => {
                if let Some(text) = markup.lang_text(child) {
                    out.push(Segment::Text(path.clone(), text));
                }
            }
            "TblBlock" => out.push(Segment::Table(path.clone(), child)),
            local if is_section_root(local) => {}
            _ => match markup.header(child) {
                Some(HeaderText::Label(label)) => {
                    collect_segments(markup, child, &path.child(label), out)
                }
                Some(HeaderText::Content(text)) => {
                    out.push(Segment::Text(path.clone(), text));
                    collect_segments(markup, child, path, out);
                }
                None => collect_segments(markup, child, path, out),
            },
        }
    }
}

/// Footnote texts of a table block
fn read_notes(markup: &Markup, block: Node) -> Vec<String> {
    block
        .descendants()
        .filter(|d| is_note(markup, *d))
        .map(|note| {
            let text = markup.cell_text(note);
            if text.is_empty() {
                flatten(note).trim().to_string()
            } else {
                text
            }
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_note(markup: &Markup, node: Node) -> bool {
    if !markup.in_scope(node) {
        return false;
    }
    let local = node.tag_name().name();
    local == "TblNote" || local.to_lowercase().ends_with("footnote")
}

fn is_empty_cell(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || EMPTY_MARKS.contains(&cell)
}

/// Cell texts of the first simple table in a block
fn read_rows(markup: &Markup, block: Node) -> Vec<Vec<String>> {
    let table = if markup.is(block, "SimpleTable") {
        Some(block)
    } else {
        markup.descendants(block, "SimpleTable").into_iter().next()
    };
    let Some(table) = table else {
        return Vec::new();
    };

    markup
        .descendants(table, "SimpTblRow")
        .into_iter()
        .map(|row| {
            markup
                .children(row, "SimpTblCell")
                .into_iter()
                .map(|cell| markup.cell_text(cell))
                .collect()
        })
        .collect()
}

/// Rows after the header become bands; header cells label the dose columns
fn bsa_bands(rows: &[Vec<String>]) -> Vec<BsaBand> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };

    data.iter()
        .filter_map(|row| {
            let (range, doses) = row.split_first()?;
            let doses: Vec<(String, String)> = doses
                .iter()
                .enumerate()
                .filter(|(_, dose)| !is_empty_cell(dose))
                .map(|(j, dose)| (header.get(j + 1).cloned().unwrap_or_default(), dose.clone()))
                .collect();
            (!range.is_empty() || !doses.is_empty()).then(|| BsaBand {
                range: range.clone(),
                doses,
            })
        })
        .collect()
}

fn plain_rows(rows: &[Vec<String>]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            row.iter()
                .filter(|c| !c.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractorConfig, PMDA_NAMESPACE};

    fn cells(row: &[&str]) -> Vec<String> {
        row.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_protocol_line_format() {
        let table = ProtocolTable {
            label: "A法".to_string(),
            regimen: "21日間連日経口投与".to_string(),
            bands: bsa_bands(&[
                cells(&["体表面積", "朝食後", "夕食後"]),
                cells(&["1.31m2未満", "900mg", "900mg"]),
                cells(&["1.31m2以上", "1,200mg", "—"]),
            ]),
            notes: Vec::new(),
        };
        assert_eq!(
            table.to_fact_line().as_str(),
            "A法:21日間連日経口投与 / BSA 1.31m2未満: 朝食後 900mg, 夕食後 900mg; 1.31m2以上: 朝食後 1,200mg"
        );
    }

    #[test]
    fn test_protocol_without_table() {
        let table = ProtocolTable {
            label: "B法".to_string(),
            regimen: "1日2回".to_string(),
            bands: Vec::new(),
            notes: Vec::new(),
        };
        assert_eq!(table.to_fact_line().as_str(), "B法:1日2回");
    }

    #[test]
    fn test_protocol_lines_carry_path_and_notes() {
        let table = ProtocolTable {
            label: "A法".to_string(),
            regimen: "1日2回".to_string(),
            bands: Vec::new(),
            notes: vec!["減量する。".to_string()],
        };
        let path = ConditionPath::root().child("乳癌");
        let lines: Vec<String> = table
            .fact_lines(&path)
            .into_iter()
            .map(FactLine::into_string)
            .collect();
        assert_eq!(lines, vec!["乳癌:A法:1日2回", "乳癌:Note:減量する。"]);
    }

    #[test]
    fn test_procedure_grammar() {
        let detector = ProtocolTableDetector::new().unwrap();
        let rows = vec![
            cells(&["検査", "300mgI/mL", "370mgI/mL"]),
            cells(&["脳血管撮影", "6～13mL", "—"]),
            cells(&["CT", "50～150mL", "50～100mL"]),
        ];
        let tables = detector.procedure_tables(&rows).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].render(), "脳血管撮影:300mgI/mL 6～13mL");
        assert_eq!(tables[1].render(), "CT:300mgI/mL 50～150mL/370mgI/mL 50～100mL");
    }

    #[test]
    fn test_procedure_grammar_requires_concentration_header() {
        let detector = ProtocolTableDetector::new().unwrap();
        let rows = vec![cells(&["年齢", "用量"]), cells(&["成人", "1錠"])];
        assert!(detector.procedure_tables(&rows).is_none());
        assert_eq!(plain_rows(&rows), vec!["年齢 | 用量", "成人 | 1錠"]);
    }

    fn lettered(body: &str) -> Option<Vec<String>> {
        let xml = format!(r#"<InfoDoseAdmin xmlns="{}"><DoseAdmin>{}</DoseAdmin></InfoDoseAdmin>"#, PMDA_NAMESPACE, body);
        let document = roxmltree::Document::parse(&xml).unwrap();
        let config = ExtractorConfig::default();
        let markup = Markup::new(&config);
        let detector = ProtocolTableDetector::new().unwrap();
        let found = detector.detect_lettered(&markup, document.root_element())?;
        Some(
            found
                .items
                .iter()
                .map(|item| match item {
                    LetteredItem::Text { path, text } => FactLine::new(path, text).into_string(),
                    LetteredItem::Protocol { path, protocol } => protocol
                        .fact_lines(path)
                        .into_iter()
                        .map(FactLine::into_string)
                        .collect::<Vec<_>>()
                        .join(" || "),
                    LetteredItem::Table { path, .. } => format!("table@{}", path),
                })
                .collect(),
        )
    }

    fn bsa_table(dose: &str, footnote: &str) -> String {
        format!(
            concat!(
                r#"<TblBlock><SimpleTable>"#,
                r#"<SimpTblRow><SimpTblCell><Lang xml:lang="ja">体表面積</Lang></SimpTblCell><SimpTblCell><Lang xml:lang="ja">1回量</Lang></SimpTblCell></SimpTblRow>"#,
                r#"<SimpTblRow><SimpTblCell><Lang xml:lang="ja">1.36m2未満</Lang></SimpTblCell><SimpTblCell><Lang xml:lang="ja">{}</Lang></SimpTblCell></SimpTblRow>"#,
                r#"</SimpleTable><TblFootnote><Lang xml:lang="ja">{}</Lang></TblFootnote></TblBlock>"#
            ),
            dose, footnote
        )
    }

    #[test]
    fn test_single_letter_does_not_fire() {
        let body = r#"<Detail><Lang xml:lang="ja">A法：1日2回</Lang></Detail>"#;
        assert!(lettered(body).is_none());
    }

    #[test]
    fn test_details_inside_tables_are_not_regimens() {
        let body = r#"<Detail><Lang xml:lang="ja">A法：1日2回</Lang></Detail>
            <TblBlock><Detail><Lang xml:lang="ja">B法：table text</Lang></Detail></TblBlock>"#;
        assert!(lettered(body).is_none());
    }

    #[test]
    fn test_regimens_keep_conditions_and_footnotes() {
        let body = format!(
            concat!(
                r#"<Item><Header><Lang xml:lang="ja">〈再発乳癌〉</Lang></Header>"#,
                r#"<Detail><Lang xml:lang="ja">A法：1日2回21日間</Lang></Detail>{}</Item>"#,
                r#"<Item><Header><Lang xml:lang="ja">〈進行胃癌〉</Lang></Header>"#,
                r#"<Detail><Lang xml:lang="ja">B法：1日2回14日間</Lang></Detail>{}</Item>"#,
                r#"<Detail><Lang xml:lang="ja">なお、患者の状態により適宜減量する。</Lang></Detail>"#
            ),
            bsa_table("1200mg", "A法の注記"),
            bsa_table("900mg", "B法の注記"),
        );
        assert_eq!(
            lettered(&body).unwrap(),
            vec![
                "再発乳癌:A法:1日2回21日間 / BSA 1.36m2未満: 1回量 1200mg || 再発乳癌:Note:A法の注記",
                "進行胃癌:B法:1日2回14日間 / BSA 1.36m2未満: 1回量 900mg || 進行胃癌:Note:B法の注記",
                "なお、患者の状態により適宜減量する。",
            ]
        );
    }

    #[test]
    fn test_markers_split_one_paragraph() {
        let body = format!(
            r#"<Detail><Lang xml:lang="ja">次のいずれかを使用する。A法：1日2回 B法：1日1回</Lang></Detail>{}{}"#,
            bsa_table("1200mg", "注1"),
            bsa_table("900mg", "注2"),
        );
        let lines = lettered(&body).unwrap();
        assert_eq!(lines[0], "次のいずれかを使用する。");
        assert!(lines[1].starts_with("A法:1日2回 / BSA"));
        assert!(lines[2].starts_with("B法:1日1回 / BSA"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_extra_tables_stay_generic() {
        let body = format!(
            r#"<Detail><Lang xml:lang="ja">A法：1日2回</Lang></Detail><Detail><Lang xml:lang="ja">B法：1日1回</Lang></Detail>{}{}{}"#,
            bsa_table("1200mg", "注1"),
            bsa_table("900mg", "注2"),
            bsa_table("600mg", "注3"),
        );
        let lines = lettered(&body).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "table@");
    }

    #[test]
    fn test_empty_cells() {
        assert!(is_empty_cell(" — "));
        assert!(is_empty_cell(""));
        assert!(!is_empty_cell("0.5mL"));
    }
}
