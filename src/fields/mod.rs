//! Constraint engine for supplier record fields
//!
//! Architecture: Service Layer - the engine orchestrates field constraints over records
//! - Each constraint delegates to the pure CNPJ and email validators
//! - Per-record constraints are independent and safe to evaluate in parallel
//! - Uniqueness spans the whole batch and is evaluated afterwards, in record order

use crate::cnpj::{validate_cnpj, Cnpj};
use crate::config::{ConstraintRule, FieldRule, GuardConfig};
use crate::domain::violations::FieldViolation;
use crate::email::{validate_email, EmailAddress};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

/// A single record read from a source, field name to value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// File the record came from, if any
    pub source: Option<PathBuf>,
    /// 0-based position within the source
    pub index: usize,
    /// Field values; `None` marks an explicit null
    pub values: BTreeMap<String, Option<String>>,
}

impl Record {
    /// Create an empty record at the given position
    pub fn new(index: usize) -> Self {
        Self { index, ..Default::default() }
    }

    /// Set the source file
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set a field value
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(field.into(), Some(value.into()));
        self
    }

    /// Insert a field value, `None` for null
    pub fn insert(&mut self, field: impl Into<String>, value: Option<String>) {
        self.values.insert(field.into(), value);
    }

    /// Field value; missing and null are both absent
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|value| value.as_deref())
    }
}

/// Evaluates configured field rules against records
#[derive(Debug, Clone)]
pub struct ConstraintEngine {
    fields: Vec<FieldRule>,
}

impl ConstraintEngine {
    /// Create an engine over the enabled field rules of a configuration
    pub fn new(config: &GuardConfig) -> Self {
        let fields: Vec<FieldRule> = config.enabled_fields().cloned().collect();
        tracing::debug!(
            "Constraint engine ready with {} fields and {} constraints",
            fields.len(),
            fields.iter().map(|f| f.constraints.len()).sum::<usize>()
        );
        Self { fields }
    }

    /// Field rules this engine evaluates
    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    /// Whether any field carries a uniqueness constraint
    pub fn has_unique_constraints(&self) -> bool {
        self.fields.iter().any(|field| field.constraints.iter().any(|c| is_unique(&c)))
    }

    /// Evaluate every per-record constraint. Uniqueness is not checked here.
    pub fn evaluate(&self, record: &Record) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        for field in &self.fields {
            let value = record.get(&field.name);

            for constraint in field.constraints.iter().filter(|c| !is_unique(c)) {
                if satisfies(constraint, value) {
                    continue;
                }

                violations.push(
                    FieldViolation::new(
                        rule_id(field, constraint),
                        &field.name,
                        render_message(constraint, &field.name, value),
                    )
                    .with_value(value)
                    .at_record(record.source.clone(), record.index),
                );
            }
        }

        violations
    }

    /// Check uniqueness across records in order. The first occurrence of a key wins.
    pub fn check_uniqueness(&self, records: &[Record]) -> Vec<FieldViolation> {
        let unique_fields: Vec<(&FieldRule, &ConstraintRule)> = self
            .fields
            .iter()
            .filter_map(|field| field.constraints.iter().find(|c| is_unique(c)).map(|c| (field, c)))
            .collect();

        if unique_fields.is_empty() {
            return Vec::new();
        }

        let mut seen: HashMap<&str, HashSet<String>> = HashMap::new();
        let mut violations = Vec::new();

        for record in records {
            for (field, constraint) in &unique_fields {
                let Some(value) = record.get(&field.name).filter(|v| !v.trim().is_empty()) else {
                    continue;
                };

                let key = unique_key(value);
                if seen.entry(field.name.as_str()).or_default().insert(key) {
                    continue;
                }

                tracing::debug!(
                    "Duplicate {} at record {} of {:?}",
                    field.name,
                    record.index,
                    record.source
                );
                violations.push(
                    FieldViolation::new(
                        rule_id(field, constraint),
                        &field.name,
                        render_message(constraint, &field.name, Some(value)),
                    )
                    .with_value(Some(value))
                    .at_record(record.source.clone(), record.index),
                );
            }
        }

        violations
    }
}

/// Identity key used for uniqueness.
///
/// Valid CNPJs compare by digits so masked and unmasked spellings collide.
/// Valid emails compare by their canonical key. Anything else compares raw.
pub fn unique_key(value: &str) -> String {
    if let Ok(cnpj) = Cnpj::parse(value) {
        return cnpj.digits();
    }
    if let Ok(email) = EmailAddress::parse(value) {
        return email.canonical_key();
    }
    value.to_string()
}

/// Render a message template for a field value
pub fn render_message(constraint: &ConstraintRule, field: &str, value: Option<&str>) -> String {
    let max = match constraint {
        ConstraintRule::MaxLength { max, .. } => max.to_string(),
        _ => String::new(),
    };

    constraint
        .message()
        .replace("{field}", field)
        .replace("{max}", &max)
        .replace("{value}", value.unwrap_or_default())
}

fn satisfies(constraint: &ConstraintRule, value: Option<&str>) -> bool {
    match constraint {
        ConstraintRule::NotBlank { .. } => value.is_some_and(|v| !v.trim().is_empty()),
        ConstraintRule::MaxLength { max, .. } => value.map_or(true, |v| v.chars().count() <= *max),
        ConstraintRule::Cnpj { .. } => validate_cnpj(value),
        ConstraintRule::Email { .. } => validate_email(value),
        ConstraintRule::Unique { .. } => true,
    }
}

fn is_unique(constraint: &&ConstraintRule) -> bool {
    matches!(constraint, ConstraintRule::Unique { .. })
}

fn rule_id(field: &FieldRule, constraint: &ConstraintRule) -> String {
    format!("{}.{}", field.name, constraint.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn supplier(index: usize, cnpj: &str, email: &str) -> Record {
        Record::new(index)
            .with("name", "Fornecedor")
            .with("description", "Materiais de escritório")
            .with("cnpj", cnpj)
            .with("email", email)
    }

    fn rule_ids(violations: &[FieldViolation]) -> Vec<&str> {
        violations.iter().map(|v| v.rule_id.as_str()).collect()
    }

    #[test]
    fn test_valid_record_has_no_violations() {
        let engine = ConstraintEngine::new(&GuardConfig::default());
        let record = supplier(0, "11.222.333/0001-81", "compras@fornecedor.com.br");
        assert!(engine.evaluate(&record).is_empty());
    }

    #[test]
    fn test_absent_fields_fail_every_applicable_constraint() {
        let engine = ConstraintEngine::new(&GuardConfig::default());
        let mut record = Record::new(0).with("name", "Fornecedor").with("description", "x");
        record.insert("cnpj", None);

        let violations = engine.evaluate(&record);
        assert_eq!(
            rule_ids(&violations),
            ["email.not_blank", "email.email", "cnpj.not_blank", "cnpj.cnpj"]
        );
        assert!(violations.iter().all(|v| v.rejected_value.is_none()));
    }

    #[test]
    fn test_invalid_cnpj_message_echoes_value() {
        let engine = ConstraintEngine::new(&GuardConfig::default());
        let record = supplier(3, "11.222.333/0001-82", "a@b.com").with_source("lote.json");

        let violations = engine.evaluate(&record);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "CNPJ inválido: 11.222.333/0001-82");
        assert_eq!(violations[0].record_index, Some(3));
        assert_eq!(violations[0].source, Some(PathBuf::from("lote.json")));
    }

    #[rstest]
    #[case("ab", true)]
    #[case("abc", true)]
    #[case("abcd", false)]
    #[case("ééé", true)]
    fn test_max_length_counts_chars(#[case] value: &str, #[case] ok: bool) {
        let constraint = ConstraintRule::MaxLength { max: 3, message: "max {max}".into() };
        assert_eq!(satisfies(&constraint, Some(value)), ok);
        assert!(satisfies(&constraint, None));
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some(""), false)]
    #[case(Some(" \t"), false)]
    #[case(Some("x"), true)]
    fn test_not_blank(#[case] value: Option<&str>, #[case] ok: bool) {
        let constraint = ConstraintRule::NotBlank { message: "m".into() };
        assert_eq!(satisfies(&constraint, value), ok);
    }

    #[test]
    fn test_render_message_placeholders() {
        let constraint =
            ConstraintRule::MaxLength { max: 10, message: "{field} > {max}: '{value}'".into() };
        assert_eq!(render_message(&constraint, "name", Some("abc")), "name > 10: 'abc'");
        assert_eq!(render_message(&constraint, "name", None), "name > 10: ''");
    }

    #[rstest]
    #[case("11.222.333/0001-81", "11222333000181")]
    #[case("11222333000181", "11222333000181")]
    #[case("Compras@Fornecedor.COM", "Compras@fornecedor.com")]
    #[case("not valid", "not valid")]
    fn test_unique_key(#[case] value: &str, #[case] key: &str) {
        assert_eq!(unique_key(value), key);
    }

    #[test]
    fn test_uniqueness_first_occurrence_wins() {
        let engine = ConstraintEngine::new(&GuardConfig::default());
        let records = vec![
            supplier(0, "11.222.333/0001-81", "a@fornecedor.com"),
            supplier(1, "11222333000181", "b@fornecedor.com"),
            supplier(2, "45.723.174/0001-10", "a@FORNECEDOR.com"),
        ];

        let violations = engine.check_uniqueness(&records);
        assert_eq!(rule_ids(&violations), ["cnpj.unique", "email.unique"]);
        assert_eq!(violations[0].record_index, Some(1));
        assert_eq!(violations[0].message, "CNPJ já cadastrado: 11222333000181");
        assert_eq!(violations[1].record_index, Some(2));
        assert_eq!(violations[1].message, "E-mail já cadastrado: a@FORNECEDOR.com");
    }

    #[test]
    fn test_blank_values_skip_uniqueness() {
        let engine = ConstraintEngine::new(&GuardConfig::default());
        let records = vec![supplier(0, "", " "), supplier(1, "", " ")];
        assert!(engine.check_uniqueness(&records).is_empty());
    }

    #[test]
    fn test_disabled_fields_are_skipped() {
        let config = crate::config::ConfigBuilder::new().disable("cnpj").build().unwrap();
        let engine = ConstraintEngine::new(&config);
        assert_eq!(engine.fields().len(), 3);

        let record = supplier(0, "bogus", "a@b.com");
        assert!(engine.evaluate(&record).is_empty());
        assert!(engine.has_unique_constraints());
    }
}
