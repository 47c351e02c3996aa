//! Supplier Guard - hardened CNPJ and email validation for supplier records
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure validators (cnpj, email, unicode) have no infrastructure dependencies
//! - Field constraints and batch imports build on the validators
//! - Import integration API provides validation workflows for record files

pub mod batch;
pub mod cnpj;
pub mod config;
pub mod domain;
pub mod email;
pub mod fields;
pub mod report;
pub mod unicode;

// Re-export main types for convenient access
pub use cnpj::{check_cnpj, mask_cnpj, validate_cnpj, Cnpj, CnpjRejection};
pub use email::{check_email, validate_email, EmailAddress, EmailRejection};

pub use domain::violations::{
    FieldViolation, GuardError, GuardResult, ValidationReport, ValidationSummary,
};

pub use config::{ConfigBuilder, ConstraintRule, FieldRule, GuardConfig, SourceConfig};

pub use fields::{ConstraintEngine, Record};

pub use batch::{BatchOptions, BatchValidator, SourceFilter};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

use std::path::Path;

/// Main validator providing high-level supplier validation operations
pub struct SupplierValidator {
    batch: BatchValidator,
    report_formatter: ReportFormatter,
}

impl SupplierValidator {
    /// Create a new validator with the given configuration
    pub fn new_with_config(config: GuardConfig) -> GuardResult<Self> {
        let batch = BatchValidator::new(config)?;
        let report_formatter = ReportFormatter::default();

        Ok(Self { batch, report_formatter })
    }

    /// Create a validator with the default supplier rules
    pub fn new() -> GuardResult<Self> {
        Self::new_with_config(GuardConfig::default())
    }

    /// Create a validator loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let config = GuardConfig::load_from_file(path)?;
        Self::new_with_config(config)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &GuardConfig {
        self.batch.config()
    }

    /// Validate record files and directories with custom options
    pub fn validate_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &BatchOptions,
    ) -> GuardResult<ValidationReport> {
        self.batch.validate_paths(paths, options)
    }

    /// Validate a single record file
    pub fn validate_file<P: AsRef<Path>>(&self, file_path: P) -> GuardResult<ValidationReport> {
        self.batch.validate_file(file_path, &BatchOptions::default())
    }

    /// Validate records already in memory, uniqueness included
    pub fn validate_records(&self, records: Vec<Record>) -> ValidationReport {
        self.batch.validate_records(records, &BatchOptions::default())
    }

    /// Validate a single record against the per-record constraints
    pub fn validate_record(&self, record: &Record) -> Vec<FieldViolation> {
        self.batch.validate_record(record)
    }

    /// Format a validation report for output
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> GuardResult<String> {
        self.report_formatter.format_report(report, format)
    }

    /// Write a formatted validation report to a writer
    pub fn write_report<W: std::io::Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        writer: W,
    ) -> GuardResult<()> {
        self.report_formatter.write_report(report, format, writer)
    }
}

/// Convenience function to create a validator with default settings
pub fn create_validator() -> GuardResult<SupplierValidator> {
    SupplierValidator::new()
}

/// Convenience function to validate a directory with default settings
pub fn validate_directory<P: AsRef<Path>>(directory: P) -> GuardResult<ValidationReport> {
    let validator = SupplierValidator::new()?;
    validator.validate_paths(&[directory], &BatchOptions::default())
}

/// Import integration utilities
pub mod import {
    use super::*;

    /// All-or-nothing check before importing a batch.
    ///
    /// Returns the report when every record is accepted and a validation
    /// error naming the number of rejected records otherwise.
    pub fn pre_import_check<P: AsRef<Path>>(paths: &[P]) -> GuardResult<ValidationReport> {
        let validator = SupplierValidator::new()?;
        let options = BatchOptions { fail_fast: true, ..Default::default() };
        let report = validator.validate_paths(paths, &options)?;

        if report.has_violations() {
            let rejected = report.summary.rejected_records();
            return Err(GuardError::validation(format!(
                "Import rejected: {} record{} with {} violation{}",
                rejected,
                if rejected == 1 { "" } else { "s" },
                report.violations.len(),
                if report.violations.len() == 1 { "" } else { "s" }
            )));
        }

        Ok(report)
    }
}
