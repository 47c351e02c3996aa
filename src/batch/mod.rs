//! Batch validation orchestrator for supplier imports
//!
//! Architecture: Domain Services - BatchValidator orchestrates a whole import run
//! - Coordinates source discovery, record loading, constraint evaluation and reporting
//! - Per-record constraints run in parallel, uniqueness runs afterwards in input order
//! - Unreadable files are skipped with a warning unless fail-fast is requested

pub mod sources;

use crate::config::GuardConfig;
use crate::domain::violations::{FieldViolation, GuardError, GuardResult, ValidationReport};
use crate::fields::{ConstraintEngine, Record};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub use sources::{load_records, parse_records, SourceFilter};

/// Validates batches of supplier records against a configuration
pub struct BatchValidator {
    /// Configuration for this run
    config: GuardConfig,
    /// Field constraint engine
    engine: ConstraintEngine,
}

/// Options for customizing batch behavior
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Whether to evaluate records in parallel
    pub parallel: bool,
    /// Abort on the first unreadable file instead of skipping it
    pub fail_fast: bool,
    /// Maximum number of records to validate
    pub max_records: Option<usize>,
    /// Include globs overriding the configured ones
    pub include_patterns: Option<Vec<String>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { parallel: true, fail_fast: false, max_records: None, include_patterns: None }
    }
}

impl BatchValidator {
    /// Create a validator for the given configuration
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        config.validate()?;
        let engine = ConstraintEngine::new(&config);
        Ok(Self { config, engine })
    }

    /// Create a validator with the default supplier rules
    pub fn with_defaults() -> GuardResult<Self> {
        Self::new(GuardConfig::default())
    }

    /// Configuration in use
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Discover, load and validate every record under the given paths
    pub fn validate_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &BatchOptions,
    ) -> GuardResult<ValidationReport> {
        let start_time = Instant::now();

        let includes = options.include_patterns.as_ref().unwrap_or(&self.config.sources.include);
        let filter = SourceFilter::new(includes)?;
        let files = filter.collect_files(paths)?;
        tracing::debug!("Validating records from {} files", files.len());

        let mut records = Vec::new();
        let mut files_read = 0;

        for file in &files {
            match load_records(file) {
                Ok(loaded) => {
                    tracing::debug!("Loaded {} records from {}", loaded.len(), file.display());
                    files_read += 1;
                    records.extend(loaded);
                }
                Err(e) if options.fail_fast => return Err(e),
                Err(e) => tracing::warn!("Skipping {}: {}", file.display(), e),
            }
        }

        let mut report = self.validate_records(records, options);
        report.summary.total_files = files_read;
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        Ok(report)
    }

    /// Validate records that are already in memory
    pub fn validate_records(
        &self,
        mut records: Vec<Record>,
        options: &BatchOptions,
    ) -> ValidationReport {
        let start_time = Instant::now();

        if let Some(max_records) = options.max_records {
            records.truncate(max_records);
        }

        let mut violations: Vec<FieldViolation> = if options.parallel && records.len() > 1 {
            records.par_iter().flat_map_iter(|record| self.engine.evaluate(record)).collect()
        } else {
            records.iter().flat_map(|record| self.engine.evaluate(record)).collect()
        };
        violations.extend(self.engine.check_uniqueness(&records));

        let rejected: HashSet<(Option<&PathBuf>, Option<usize>)> =
            violations.iter().map(|v| (v.source.as_ref(), v.record_index)).collect();
        let accepted = records
            .iter()
            .filter(|r| !rejected.contains(&(r.source.as_ref(), Some(r.index))))
            .count();
        let sources: HashSet<Option<&PathBuf>> =
            records.iter().map(|r| r.source.as_ref()).collect();
        let file_count = sources.iter().filter(|source| source.is_some()).count();
        let total = records.len();

        let mut report = ValidationReport::new();
        for violation in violations {
            report.add_violation(violation);
        }

        report.set_counts(file_count, total, accepted);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.config.fingerprint());
        report.sort_violations();

        tracing::debug!(
            "Validated {} records: {} accepted, {} violations",
            total,
            accepted,
            report.violations.len()
        );
        report
    }

    /// Evaluate the field constraints of a single record
    pub fn validate_record(&self, record: &Record) -> Vec<FieldViolation> {
        self.engine.evaluate(record)
    }

    /// Validate a single file, failing if it cannot be read
    pub fn validate_file<P: AsRef<Path>>(
        &self,
        path: P,
        options: &BatchOptions,
    ) -> GuardResult<ValidationReport> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GuardError::validation(format!("Not a file: {}", path.display())));
        }
        let options = BatchOptions { fail_fast: true, ..options.clone() };
        self.validate_paths(&[path], &options)
    }
}
