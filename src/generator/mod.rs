//! Application scaffolding generators.
//!
//! A [`GeneratorPlugin`] turns validated tables into source files for one
//! target framework. Plugins are held by name in a [`GeneratorRegistry`].

mod registry;
pub mod yii;

pub use registry::GeneratorRegistry;

use crate::model::{FrameworkConfig, GeneratedFile, Table};
use crate::sql::TypeMapping;
use crate::template::TemplateError;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Migration timestamp layout: `YYYYMMDDHHMMSS`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Target not supported: {0}")]
    UnsupportedTarget(String),
    #[error("Diagram validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Failed to build template context: {0}")]
    Context(#[from] tera::Error),
}

/// Per-run generation switches.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub generate_migration: bool,
    pub generate_model: bool,
    pub generate_repository: bool,
    /// Only these tables are generated; empty means all.
    pub selected_tables: Vec<String>,
    /// Explicit order for the named tables, applied after dependency ordering.
    pub table_order: Vec<String>,
    /// Tables already in their final order; skips dependency ordering.
    pub pre_ordered: Option<Vec<Table>>,
    /// Stamped into migration names. Never read from the clock here.
    pub timestamp: NaiveDateTime,
}

impl GenerateOptions {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            generate_migration: true,
            generate_model: true,
            generate_repository: false,
            selected_tables: Vec::new(),
            table_order: Vec::new(),
            pre_ordered: None,
            timestamp,
        }
    }

    pub fn is_selected(&self, table: &str) -> bool {
        self.selected_tables.is_empty() || self.selected_tables.iter().any(|t| t == table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Capability set every target framework implements.
pub trait GeneratorPlugin: Send + Sync {
    /// Defaults interpolated into every artifact; the registry merges overrides onto it.
    fn config(&self) -> &FrameworkConfig;

    fn generate_files(
        &self,
        tables: &[Table],
        config: &FrameworkConfig,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedFile>, GenerateError>;

    /// Artifact kinds this plugin can emit.
    fn supported_files(&self) -> BTreeSet<&'static str>;

    /// Collects every violation; never stops at the first.
    fn validate_diagram(&self, tables: &[Table]) -> ValidationReport {
        validate_tables(tables)
    }

    fn transform_column_type(&self, abstract_type: &str) -> TypeMapping;
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Shared policy: every table has a primary key, every table and column name is
/// a conservative identifier.
pub fn validate_tables(tables: &[Table]) -> ValidationReport {
    let mut errors = Vec::new();

    for table in tables {
        if !is_valid_identifier(&table.name) {
            errors.push(format!(
                "Invalid table name '{}': use a letter or underscore followed by letters, digits or underscores",
                table.name
            ));
        }
        if !table.has_primary_key() {
            errors.push(format!("Table '{}' has no primary key column", table.name));
        }
        for column in &table.columns {
            if !is_valid_identifier(&column.name) {
                errors.push(format!(
                    "Invalid column name '{}.{}': use a letter or underscore followed by letters, digits or underscores",
                    table.name, column.name
                ));
            }
        }
    }

    ValidationReport::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    #[test]
    fn test_missing_primary_key() {
        let tables = vec![Table::new("logs", vec![Column::new("message", "text")])];
        let report = validate_tables(&tables);

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("logs"));
        assert!(report.errors[0].contains("primary key"));
    }

    #[test]
    fn test_collects_every_defect() {
        let tables = vec![
            Table::new("9lives", vec![Column::new("name", "text")]),
            Table::new(
                "users",
                vec![
                    Column::primary("id", "int"),
                    Column::new("e-mail", "text"),
                    Column::new("full name", "text"),
                ],
            ),
            Table::new("orders", vec![Column::new("id", "int")]),
        ];
        let report = validate_tables(&tables);

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 5);
    }

    #[test]
    fn test_valid_diagram() {
        let tables = vec![Table::new("_users", vec![Column::primary("id", "int")])];
        assert_eq!(validate_tables(&tables), ValidationReport::from_errors(vec![]));
        assert!(validate_tables(&tables).is_valid);
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("20240102030405").unwrap();
        assert_eq!(ts.format(TIMESTAMP_FORMAT).to_string(), "20240102030405");
        assert!(parse_timestamp("2024-01-02").is_err());
    }

    #[test]
    fn test_identifier_pattern() {
        assert!(is_valid_identifier("order_items2"));
        assert!(is_valid_identifier("_x"));
        assert!(!is_valid_identifier("2x"));
        assert!(!is_valid_identifier("ユーザー"));
        assert!(!is_valid_identifier(""));
    }
}
