//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use pmda_batch::{DocumentError, RunMetrics, RunReport};
use pmda_domain::Category;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Document errors listed individually before the rest are elided.
const MAX_LISTED_ERRORS: usize = 20;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the end-of-run summary.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_report_json(report),
            OutputFormat::Table => Ok(self.format_report_table(report)),
        }
    }

    fn format_report_json(&self, report: &RunReport) -> Result<String> {
        let summary = serde_json::json!({
            "metrics": report.metrics,
            "errors": report.errors,
        });
        Ok(serde_json::to_string_pretty(&summary)?)
    }

    fn format_report_table(&self, report: &RunReport) -> String {
        let mut sections = vec![self.format_run_table(&report.metrics)];

        if report.metrics.records_produced > 0 {
            sections.push(self.format_category_table(&report.metrics));
        }
        if !report.errors.is_empty() {
            sections.push(self.format_errors(&report.errors));
        }

        sections.join("\n\n")
    }

    fn format_run_table(&self, metrics: &RunMetrics) -> String {
        let rows = [
            ("Files found", metrics.files_found.to_string()),
            ("Unreadable", metrics.unreadable.to_string()),
            ("Duplicates removed", metrics.duplicates_removed.to_string()),
            ("Documents processed", metrics.documents_processed.to_string()),
            ("Documents failed", metrics.documents_failed.to_string()),
            ("Records produced", metrics.records_produced.to_string()),
            (
                "Batches",
                format!("{} x {}", metrics.batch_count, metrics.batch_size),
            ),
            ("Workers", metrics.workers.to_string()),
            ("Nodes visited", metrics.nodes_visited.to_string()),
            ("Elapsed", format!("{}ms", metrics.elapsed_ms)),
        ];

        let mut builder = Builder::default();
        builder.push_record(["Stage", "Count"]);
        for (label, value) in rows {
            builder.push_record([label.to_string(), value]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn format_category_table(&self, metrics: &RunMetrics) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Category", "Entries", "Records"]);
        for category in Category::ALL {
            builder.push_record([
                category.as_str().to_string(),
                metrics.facts(category).to_string(),
                metrics.records_with(category).to_string(),
            ]);
        }
        builder.push_record([
            "all text categories".to_string(),
            metrics.total_facts().to_string(),
            metrics.records_with_all_text.to_string(),
        ]);

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format per-document errors, eliding past the first twenty.
    pub fn format_errors(&self, errors: &[DocumentError]) -> String {
        let mut lines = vec![self.warning(&format!("{} document(s) failed", errors.len()))];
        for error in errors.iter().take(MAX_LISTED_ERRORS) {
            lines.push(format!("  {}", error));
        }
        if errors.len() > MAX_LISTED_ERRORS {
            lines.push(format!("  ... and {} more", errors.len() - MAX_LISTED_ERRORS));
        }
        lines.join("\n")
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmda_batch::ErrorStage;

    fn create_test_report() -> RunReport {
        let mut report = RunReport::default();
        report.metrics.files_found = 3;
        report.metrics.documents_processed = 2;
        report.metrics.records_produced = 2;
        report.metrics.facts_per_category.insert(Category::Dosage, 5);
        report.metrics.records_with_category.insert(Category::Dosage, 2);
        report.errors.push(DocumentError::new(
            "broken.xml",
            ErrorStage::Parse,
            "unexpected end of stream",
        ));
        report
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&create_test_report()).unwrap();
        assert!(output.contains("Files found"));
        assert!(output.contains("Records produced"));
        assert!(output.contains("dosage"));
        assert!(output.contains("broken.xml (parse): unexpected end of stream"));
    }

    #[test]
    fn test_table_without_records() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&RunReport::default()).unwrap();
        assert!(output.contains("Files found"));
        assert!(!output.contains("Category"));
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_report(&create_test_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["metrics"]["files_found"], 3);
        assert_eq!(value["errors"][0]["stage"], "parse");
    }

    #[test]
    fn test_errors_are_elided() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let errors: Vec<DocumentError> = (0..25)
            .map(|i| DocumentError::new(format!("doc_{}.xml", i), ErrorStage::Read, "gone"))
            .collect();
        let output = formatter.format_errors(&errors);
        assert!(output.starts_with("⚠ 25 document(s) failed"));
        assert!(output.contains("doc_19.xml"));
        assert!(!output.contains("doc_20.xml"));
        assert!(output.ends_with("... and 5 more"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.success("test");
        assert_eq!(msg, "✓ test");
    }

    #[test]
    fn test_error_message() {
        let err = crate::CliError::InvalidInput("no PMDA export directory found".to_string());
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.error(&format!("Error: {}", err));
        assert!(msg.starts_with("✗ Error: "));
        assert!(msg.contains("no PMDA export directory found"));
    }
}
