//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is converted to terminal, JSON and JUnit representations
//! - Each formatter encapsulates the rules for its specific output format
//! - Rejected values can be masked so reports are safe to share

use crate::domain::violations::{FieldViolation, GuardError, GuardResult, ValidationReport};
use colored::{ColoredString, Colorize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

/// Replacement shown for rejected values when values are hidden
const HIDDEN_VALUE: &str = "***";

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format with colors
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// JUnit XML format for CI integration
    Junit,
}

impl OutputFormat {
    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json", "junit"]
    }
}

impl FromStr for OutputFormat {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "junit" => Ok(Self::Junit),
            other => Err(GuardError::validation(format!(
                "Unknown output format '{other}'. Available: {}",
                Self::all_formats().join(", ")
            ))),
        }
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
    /// Whether rejected values are printed in human output
    pub show_values: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true, max_violations: None, show_values: true }
    }
}

/// Main report formatter that dispatches to specific formatters
pub struct ReportFormatter {
    options: ReportOptions,
}

type RecordKey<'a> = (Option<&'a PathBuf>, Option<usize>);

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a validation report in the specified format
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> GuardResult<String> {
        let violations = self.limit_violations(&report.violations);

        match format {
            OutputFormat::Human => Ok(self.format_human(report, violations)),
            OutputFormat::Json => self.format_json(report, violations),
            OutputFormat::Junit => Ok(self.format_junit(report, violations)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn limit_violations<'a>(&self, violations: &'a [FieldViolation]) -> &'a [FieldViolation] {
        match self.options.max_violations {
            Some(max) if max < violations.len() => &violations[..max],
            _ => violations,
        }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.options.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Format report in human-readable format
    fn format_human(&self, report: &ValidationReport, violations: &[FieldViolation]) -> String {
        let mut output = String::new();

        if report.violations.is_empty() {
            let headline = self.paint("All supplier records are valid", |s| s.green());
            output.push_str(&format!("✅ {headline}\n"));
        } else {
            output.push_str(&format!(
                "❌ {}\n\n",
                self.paint("Supplier records rejected", |s| s.red().bold())
            ));

            let mut by_source: BTreeMap<Option<&PathBuf>, Vec<&FieldViolation>> = BTreeMap::new();
            for violation in violations {
                by_source.entry(violation.source.as_ref()).or_default().push(violation);
            }

            for (source, source_violations) in by_source {
                let heading =
                    source.map_or_else(|| "(inline)".to_string(), |s| s.display().to_string());
                output.push_str(&format!("📁 {}\n", self.paint(&heading, |s| s.bold())));

                for violation in source_violations {
                    let position = violation
                        .record_index
                        .map_or_else(|| "#?".to_string(), |index| format!("#{index}"));

                    output.push_str(&format!(
                        "  {} {} [{}] {}",
                        self.paint(&position, |s| s.dimmed()),
                        violation.field,
                        self.paint(&violation.rule_id, |s| s.yellow()),
                        violation.message
                    ));

                    if let Some(value) = &violation.rejected_value {
                        let shown =
                            if self.options.show_values { value.as_str() } else { HIDDEN_VALUE };
                        let value = self.paint(&format!("(value: {shown:?})"), |s| s.dimmed());
                        output.push_str(&format!(" {value}"));
                    }
                    output.push('\n');
                }
                output.push('\n');
            }

            let omitted = report.violations.len() - violations.len();
            if omitted > 0 {
                output.push_str(&format!("… {omitted} more violations not shown\n\n"));
            }
        }

        output.push_str(&self.format_summary(report));
        output
    }

    /// Format report in JSON format
    fn format_json(
        &self,
        report: &ValidationReport,
        violations: &[FieldViolation],
    ) -> GuardResult<String> {
        let json_violations: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "rule_id": v.rule_id,
                    "field": v.field,
                    "source": v.source.as_ref().map(|s| s.display().to_string()),
                    "record_index": v.record_index,
                    "message": v.message,
                    "rejected_value": v.rejected_value,
                    "detected_at": v.detected_at.to_rfc3339()
                })
            })
            .collect();

        let json_report = serde_json::json!({
            "violations": json_violations,
            "summary": {
                "total_files": report.summary.total_files,
                "total_records": report.summary.total_records,
                "accepted_records": report.summary.accepted_records,
                "rejected_records": report.summary.rejected_records(),
                "total_violations": report.summary.total_violations(),
                "violations_by_field": report.summary.violations_by_field,
                "execution_time_ms": report.summary.execution_time_ms,
                "validated_at": report.summary.validated_at.to_rfc3339()
            },
            "config_fingerprint": report.config_fingerprint
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| GuardError::validation(format!("JSON serialization failed: {e}")))
    }

    /// Format report in JUnit XML format, one testcase per rejected record
    fn format_junit(&self, report: &ValidationReport, violations: &[FieldViolation]) -> String {
        let mut by_record: BTreeMap<RecordKey<'_>, Vec<&FieldViolation>> = BTreeMap::new();
        for violation in violations {
            by_record
                .entry((violation.source.as_ref(), violation.record_index))
                .or_default()
                .push(violation);
        }

        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<testsuite name=\"supplier-guard\" tests=\"{}\" failures=\"{}\" errors=\"0\" time=\"{:.3}\">\n",
            report.summary.total_records.max(by_record.len()),
            by_record.len(),
            execution_time
        ));

        for ((source, index), record_violations) in by_record {
            let classname =
                source.map_or_else(|| "records".to_string(), |s| s.display().to_string());
            let name = index.map_or_else(|| "record".to_string(), |i| format!("record {i}"));

            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\">\n",
                escape_xml(&classname),
                escape_xml(&name)
            ));
            xml.push_str(&format!(
                "    <failure message=\"{} violation{}\">\n",
                record_violations.len(),
                if record_violations.len() == 1 { "" } else { "s" }
            ));
            for violation in record_violations {
                xml.push_str(&format!(
                    "      {} [{}] {}\n",
                    escape_xml(&violation.field),
                    escape_xml(&violation.rule_id),
                    escape_xml(&violation.message)
                ));
            }
            xml.push_str("    </failure>\n");
            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Format the summary section
    fn format_summary(&self, report: &ValidationReport) -> String {
        let summary = &report.summary;
        let execution_time = (summary.execution_time_ms as f64) / 1000.0;
        let total_violations = summary.total_violations();

        let violations = format!(
            "{total_violations} violation{}",
            if total_violations == 1 { "" } else { "s" }
        );
        let violations = if total_violations == 0 {
            self.paint(&violations, |s| s.green())
        } else {
            self.paint(&violations, |s| s.red())
        };

        format!(
            "📊 {} {} in {} of {} records across {} files ({:.1}s)\n",
            self.paint("Summary:", |s| s.bold()),
            violations,
            summary.rejected_records(),
            summary.total_records,
            summary.total_files,
            execution_time
        )
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

/// Escape XML special characters, dropping control characters XML 1.0 cannot carry
fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            c if (c as u32) < 0x20 => {}
            c => escaped.push(c),
        }
    }
    escaped
}
