//! Record source discovery and loading
//!
//! Architecture: Anti-Corruption Layer - SourceFilter and the loaders translate files into records
//! - Directories are walked recursively and filtered by file name globs
//! - JSON arrays and YAML sequences of mappings become typed records
//! - Scalars are rendered to text so constraints only ever see strings

use crate::domain::violations::{GuardError, GuardResult};
use crate::fields::Record;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Selects record files by name
#[derive(Debug, Clone)]
pub struct SourceFilter {
    /// Compiled include globs
    patterns: Vec<glob::Pattern>,
}

impl SourceFilter {
    /// Create a filter from include globs
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> GuardResult<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern.as_ref()).map_err(|e| {
                    GuardError::config(format!("Invalid include pattern '{}': {e}", pattern.as_ref()))
                })
            })
            .collect::<GuardResult<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Whether a file name matches any include glob
    pub fn matches<P: AsRef<Path>>(&self, path: P) -> bool {
        let Some(name) = path.as_ref().file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };
        self.patterns.iter().any(|pattern| pattern.matches(&name))
    }

    /// Every matching file under a directory, in file name order
    pub fn find_files<P: AsRef<Path>>(&self, root: P) -> Vec<PathBuf> {
        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.matches(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Expand input paths into files. Explicit files are kept as given.
    pub fn collect_files<P: AsRef<Path>>(&self, paths: &[P]) -> GuardResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            let path = path.as_ref();

            if path.is_file() {
                files.push(path.to_path_buf());
            } else if path.is_dir() {
                let found = self.find_files(path);
                tracing::debug!("Found {} record files under {}", found.len(), path.display());
                files.extend(found);
            } else {
                return Err(GuardError::Io {
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("No such file or directory: {}", path.display()),
                    ),
                });
            }
        }

        Ok(files)
    }
}

/// Read and parse all records from a file
pub fn load_records<P: AsRef<Path>>(path: P) -> GuardResult<Vec<Record>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let records = parse_records(&content, is_json(path))
        .map_err(|message| GuardError::parse(path.display().to_string(), message))?;

    Ok(records.into_iter().map(|record| record.with_source(path)).collect())
}

/// Parse records from JSON or YAML text
pub fn parse_records(content: &str, json: bool) -> Result<Vec<Record>, String> {
    let document: Value = if json {
        serde_json::from_str(content).map_err(|e| e.to_string())?
    } else {
        serde_yaml::from_str(content).map_err(|e| e.to_string())?
    };

    let items = match document {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => return Err(format!("expected a sequence of records, found {}", kind(&other))),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => {
                let mut record = Record::new(index);
                for (field, value) in map {
                    record.insert(field, render_value(value));
                }
                Ok(record)
            }
            other => Err(format!("record {index} is {}, expected a mapping", kind(&other))),
        })
        .collect()
}

/// Textual form of a field value; null is absent
pub fn render_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
