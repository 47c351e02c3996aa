//! Configuration loading and management for supplier-guard
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to typed field rules
//! - The default rules mirror the supplier registration form and live in the domain
//! - Configuration acts as a repository for field constraints and source filters

use crate::domain::violations::{GuardError, GuardResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Supported configuration format versions
const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Configuration format version
    pub version: String,
    /// Which files are read as record sources
    #[serde(default)]
    pub sources: SourceConfig,
    /// Field rules, evaluated in order
    pub fields: Vec<FieldRule>,
}

/// Record source discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// File name globs read when walking directories
    pub include: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { include: vec!["*.json".to_string(), "*.yaml".to_string(), "*.yml".to_string()] }
    }
}

/// Constraints attached to a single record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Field name as it appears in the records
    pub name: String,
    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Constraints evaluated against the field value
    pub constraints: Vec<ConstraintRule>,
}

impl FieldRule {
    /// Create an enabled rule with no constraints
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), enabled: true, constraints: Vec::new() }
    }

    /// Append a constraint
    pub fn with(mut self, constraint: ConstraintRule) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// A declarative constraint with its message template.
///
/// Templates may use `{value}`, `{field}` and `{max}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintRule {
    /// Value present and not only whitespace
    NotBlank { message: String },
    /// Value absent or at most `max` characters
    MaxLength { max: usize, message: String },
    /// Value is a valid CNPJ
    Cnpj { message: String },
    /// Value is a valid email address
    Email { message: String },
    /// No earlier record in the batch has the same key
    Unique { message: String },
}

impl ConstraintRule {
    /// Snake-case name of the constraint kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotBlank { .. } => "not_blank",
            Self::MaxLength { .. } => "max_length",
            Self::Cnpj { .. } => "cnpj",
            Self::Email { .. } => "email",
            Self::Unique { .. } => "unique",
        }
    }

    /// The message template
    pub fn message(&self) -> &str {
        match self {
            Self::NotBlank { message }
            | Self::MaxLength { message, .. }
            | Self::Cnpj { message }
            | Self::Email { message }
            | Self::Unique { message } => message,
        }
    }

    fn not_blank(message: &str) -> Self {
        Self::NotBlank { message: message.to_string() }
    }

    fn max_length(max: usize, message: &str) -> Self {
        Self::MaxLength { max, message: message.to_string() }
    }
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            GuardError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        tracing::debug!("Loaded {} field rules from {}", config.fields.len(), path.as_ref().display());
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Default configuration: the supplier registration rules
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            sources: SourceConfig::default(),
            fields: Self::supplier_fields(),
        }
    }

    fn supplier_fields() -> Vec<FieldRule> {
        vec![
            FieldRule::new("name")
                .with(ConstraintRule::not_blank("O nome não pode ser vazio"))
                .with(ConstraintRule::max_length(100, "O nome deve ter no máximo 100 caracteres")),
            FieldRule::new("email")
                .with(ConstraintRule::not_blank("O e-mail não pode ser vazio"))
                .with(ConstraintRule::Email { message: "E-mail inválido".to_string() })
                .with(ConstraintRule::max_length(
                    100,
                    "O e-mail deve ter no máximo 100 caracteres",
                ))
                .with(ConstraintRule::Unique { message: "E-mail já cadastrado: {value}".to_string() }),
            FieldRule::new("description")
                .with(ConstraintRule::not_blank("A descrição não pode ser vazia"))
                .with(ConstraintRule::max_length(
                    255,
                    "A descrição deve ter no máximo 255 caracteres",
                )),
            FieldRule::new("cnpj")
                .with(ConstraintRule::not_blank("O CNPJ não pode ser vazio"))
                .with(ConstraintRule::Cnpj { message: "CNPJ inválido: {value}".to_string() })
                .with(ConstraintRule::Unique { message: "CNPJ já cadastrado: {value}".to_string() }),
        ]
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(GuardError::config(format!(
                "Unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        for pattern in &self.sources.include {
            glob::Pattern::new(pattern).map_err(|e| {
                GuardError::config(format!("Invalid include pattern '{pattern}': {e}"))
            })?;
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(GuardError::config("Field rule with an empty name"));
            }
            if !names.insert(field.name.as_str()) {
                return Err(GuardError::config(format!("Duplicate field rule '{}'", field.name)));
            }

            let mut kinds = HashSet::new();
            for constraint in &field.constraints {
                if !kinds.insert(constraint.kind()) {
                    return Err(GuardError::config(format!(
                        "Duplicate constraint '{}' on field '{}'",
                        constraint.kind(),
                        field.name
                    )));
                }
                if constraint.message().trim().is_empty() {
                    return Err(GuardError::config(format!(
                        "Empty message for constraint '{}' on field '{}'",
                        constraint.kind(),
                        field.name
                    )));
                }
                if let ConstraintRule::MaxLength { max: 0, .. } = constraint {
                    return Err(GuardError::config(format!(
                        "max_length on field '{}' must be greater than zero",
                        field.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Enabled field rules in declaration order
    pub fn enabled_fields(&self) -> impl Iterator<Item = &FieldRule> {
        self.fields.iter().filter(|field| field.enabled)
    }

    /// Look up a field rule by name
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> GuardResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GuardError::config(format!("Failed to serialize config: {e}")))
    }

    /// SHA-256 fingerprint of everything that affects validation results
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.version.as_bytes());
        for pattern in &self.sources.include {
            hasher.update(b"\0include\0");
            hasher.update(pattern.as_bytes());
        }

        for field in &self.fields {
            hasher.update(b"\0field\0");
            hasher.update(field.name.as_bytes());
            hasher.update([u8::from(field.enabled)]);

            for constraint in &field.constraints {
                hasher.update(b"\0constraint\0");
                hasher.update(constraint.kind().as_bytes());
                if let ConstraintRule::MaxLength { max, .. } = constraint {
                    hasher.update((*max as u64).to_le_bytes());
                }
                hasher.update(constraint.message().as_bytes());
            }
        }

        format!("{:x}", hasher.finalize())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_true() -> bool {
    true
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: GuardConfig,
}

impl ConfigBuilder {
    /// Start from the default supplier rules
    pub fn new() -> Self {
        Self { config: GuardConfig::default() }
    }

    /// Start from an empty rule set
    pub fn empty() -> Self {
        Self {
            config: GuardConfig {
                version: "1.0".to_string(),
                sources: SourceConfig::default(),
                fields: Vec::new(),
            },
        }
    }

    /// Add an include glob for record sources
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.config.sources.include.push(pattern.into());
        self
    }

    /// Add or replace a field rule
    pub fn field(mut self, rule: FieldRule) -> Self {
        self.config.fields.retain(|existing| existing.name != rule.name);
        self.config.fields.push(rule);
        self
    }

    /// Disable a field rule by name
    pub fn disable(mut self, name: &str) -> Self {
        for field in self.config.fields.iter_mut().filter(|f| f.name == name) {
            field.enabled = false;
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GuardResult<GuardConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = GuardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fields.len(), 4);

        let cnpj = config.field("cnpj").unwrap();
        let kinds: Vec<_> = cnpj.constraints.iter().map(ConstraintRule::kind).collect();
        assert_eq!(kinds, ["not_blank", "cnpj", "unique"]);
    }

    #[test]
    fn test_yaml_round_trip_and_load() {
        let yaml = serde_yaml::to_string(&GuardConfig::default()).unwrap();
        assert!(yaml.contains("kind: max_length"));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let loaded = GuardConfig::load_from_file(file.path()).unwrap();
        assert_eq!(loaded, GuardConfig::default());
    }

    #[test]
    fn test_load_from_str() {
        let config = GuardConfig::load_from_str(
            r#"
version: "1.0"
fields:
  - name: tax_id
    constraints:
      - kind: cnpj
        message: "bad CNPJ {value}"
"#,
        )
        .unwrap();

        assert_eq!(config.sources, SourceConfig::default());
        assert!(config.fields[0].enabled);
        assert_eq!(config.fields[0].constraints[0].message(), "bad CNPJ {value}");
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let err = GuardConfig::load_from_str("version: \"2.0\"\nfields: []\n").unwrap_err();
        assert!(err.to_string().contains("Unsupported configuration version"));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_constraints() {
        let duplicate_field = ConfigBuilder::empty()
            .field(FieldRule::new("a").with(ConstraintRule::not_blank("x")))
            .build()
            .map(|mut c| {
                c.fields.push(c.fields[0].clone());
                c.validate()
            });
        assert!(matches!(duplicate_field, Ok(Err(_))));

        let duplicate_kind = ConfigBuilder::empty()
            .field(
                FieldRule::new("a")
                    .with(ConstraintRule::not_blank("x"))
                    .with(ConstraintRule::not_blank("y")),
            )
            .build();
        assert!(duplicate_kind.is_err());

        let zero_max = ConfigBuilder::empty()
            .field(FieldRule::new("a").with(ConstraintRule::max_length(0, "x")))
            .build();
        assert!(zero_max.is_err());

        let empty_message = ConfigBuilder::empty()
            .field(FieldRule::new("a").with(ConstraintRule::not_blank("  ")))
            .build();
        assert!(empty_message.is_err());

        let bad_glob = ConfigBuilder::empty().include("[").build();
        assert!(bad_glob.is_err());
    }

    #[test]
    fn test_fingerprint_tracks_rules() {
        let base = GuardConfig::default();
        assert_eq!(base.fingerprint(), GuardConfig::default().fingerprint());

        let disabled = ConfigBuilder::new().disable("description").build().unwrap();
        assert_ne!(base.fingerprint(), disabled.fingerprint());
        assert_eq!(disabled.enabled_fields().count(), 3);
    }

    #[test]
    fn test_builder_replaces_field() {
        let config = ConfigBuilder::new()
            .field(FieldRule::new("cnpj").with(ConstraintRule::Cnpj { message: "x".into() }))
            .build()
            .unwrap();

        assert_eq!(config.fields.len(), 4);
        assert_eq!(config.field("cnpj").unwrap().constraints.len(), 1);
        assert!(config.to_json().unwrap().contains("\"kind\": \"cnpj\""));
    }
}
