//! Domain models for field violations and batch validation results
//!
//! Architecture: Rich Domain Models - violations carry their own location and rendering
//! - A FieldViolation pins a failed constraint to a source, record and field
//! - ValidationReport is the aggregate root over a batch of records
//! - Rejected values travel with the violation so callers can echo them back

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A failed field constraint found while validating a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Rule identifier, `<field>.<constraint>`
    pub rule_id: String,
    /// Name of the offending field
    pub field: String,
    /// File the record came from, if any
    pub source: Option<PathBuf>,
    /// 0-based position of the record within its source
    pub record_index: Option<usize>,
    /// Rendered, human-readable message
    pub message: String,
    /// The value that was rejected (absent values are `None`)
    pub rejected_value: Option<String>,
    /// When this violation was detected
    pub detected_at: DateTime<Utc>,
}

impl FieldViolation {
    /// Create a new violation for a field
    pub fn new(
        rule_id: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            field: field.into(),
            source: None,
            record_index: None,
            message: message.into(),
            rejected_value: None,
            detected_at: Utc::now(),
        }
    }

    /// Pin the violation to a record in a source file
    pub fn at_record(mut self, source: Option<PathBuf>, index: usize) -> Self {
        self.source = source;
        self.record_index = Some(index);
        self
    }

    /// Attach the rejected value
    pub fn with_value(mut self, value: Option<&str>) -> Self {
        self.rejected_value = value.map(str::to_string);
        self
    }

    /// Format violation for display
    pub fn format_display(&self) -> String {
        let location = match (&self.source, self.record_index) {
            (Some(source), Some(index)) => format!("{}#{index} ", source.display()),
            (None, Some(index)) => format!("#{index} "),
            (Some(source), None) => format!("{} ", source.display()),
            (None, None) => String::new(),
        };

        format!("{location}{} [{}] {}", self.field, self.rule_id, self.message)
    }
}

/// Summary statistics for a validation report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of record files read
    pub total_files: usize,
    /// Number of records validated
    pub total_records: usize,
    /// Records with zero violations
    pub accepted_records: usize,
    /// Violation counts keyed by field name
    pub violations_by_field: BTreeMap<String, usize>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when validation was performed
    pub validated_at: DateTime<Utc>,
}

impl ValidationSummary {
    /// Records with at least one violation
    pub fn rejected_records(&self) -> usize {
        self.total_records.saturating_sub(self.accepted_records)
    }

    /// Total number of violations
    pub fn total_violations(&self) -> usize {
        self.violations_by_field.values().sum()
    }
}

/// Complete validation report for a batch of records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All violations found during validation
    pub violations: Vec<FieldViolation>,
    /// Summary statistics
    pub summary: ValidationSummary,
    /// Fingerprint of the rules used for this validation
    pub config_fingerprint: Option<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            summary: ValidationSummary { validated_at: Utc::now(), ..Default::default() },
            config_fingerprint: None,
        }
    }

    /// Add a violation to the report
    pub fn add_violation(&mut self, violation: FieldViolation) {
        *self.summary.violations_by_field.entry(violation.field.clone()).or_default() += 1;
        self.violations.push(violation);
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Violations raised against a given field
    pub fn violations_for_field<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a FieldViolation> + 'a {
        self.violations.iter().filter(move |v| v.field == field)
    }

    /// Record the number of files and records processed
    pub fn set_counts(&mut self, files: usize, records: usize, accepted: usize) {
        self.summary.total_files = files;
        self.summary.total_records = records;
        self.summary.accepted_records = accepted;
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the configuration fingerprint
    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }

    /// Sort violations by source, record and field for consistent output
    pub fn sort_violations(&mut self) {
        self.violations.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.record_index.cmp(&b.record_index))
                .then_with(|| a.field.cmp(&b.field))
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur outside the pure validators
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Configuration file could not be loaded, parsed or validated
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A record file could not be parsed
    #[error("Parse error in {source_name}: {message}")]
    Parse { source_name: String, message: String },

    /// Validation operation failed as a whole
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl GuardError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a parse error
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse { source_name: source_name.into(), message: message.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }
}

/// Result type for operations that can fail
pub type GuardResult<T> = Result<T, GuardError>;
