//! Diagram model shared by the exporters and the scaffolding generators.
//!
//! Relationships are directed from the referencing (child) column to the
//! referenced (parent) column: `from_table.from_column -> to_table.to_column`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Dialect-agnostic type such as `varchar(255)`.
    #[serde(rename = "type", alias = "abstractType")]
    pub abstract_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_indexed: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>, abstract_type: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            abstract_type: abstract_type.into(),
            nullable: true,
            is_primary_key: false,
            is_foreign_key: false,
            is_unique: false,
            is_indexed: false,
            comment: None,
            default_value: None,
        }
    }

    /// Primary key column; never nullable.
    pub fn primary(name: impl Into<String>, abstract_type: impl Into<String>) -> Self {
        let mut column = Self::new(name, abstract_type);
        column.is_primary_key = true;
        column.nullable = false;
        column
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn foreign(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub columns: Vec<Column>,
    /// Relationships where this table is the referencing side.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Lower is created earlier; `None` sorts last.
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            columns,
            relationships: Vec::new(),
            priority: None,
            comment: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.is_primary_key)
    }

    /// Sort key for priority ordering: missing priority sorts after every explicit one.
    pub(crate) fn priority_key(&self) -> i64 {
        self.priority.map_or(i64::MAX, i64::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    #[serde(alias = "one_to_one", alias = "1:1")]
    OneToOne,
    #[default]
    #[serde(alias = "one_to_many", alias = "1:n")]
    OneToMany,
    #[serde(alias = "many_to_many", alias = "n:m")]
    ManyToMany,
}

impl Cardinality {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "one_to_one" | "1:1" => Some(Self::OneToOne),
            "one_to_many" | "1:n" => Some(Self::OneToMany),
            "many_to_many" | "n:m" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    NoAction,
}

impl ReferentialAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "restrict" => Some(Self::Restrict),
            "cascade" => Some(Self::Cascade),
            "set_null" => Some(Self::SetNull),
            "set_default" => Some(Self::SetDefault),
            "no_action" => Some(Self::NoAction),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    /// Referencing (child) table.
    pub from_table: String,
    pub from_column: String,
    /// Referenced (parent) table.
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
}

impl Relationship {
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        let from_table = from_table.into();
        let from_column = from_column.into();
        let to_table = to_table.into();
        let to_column = to_column.into();
        Self {
            id: format!("{from_table}.{from_column}->{to_table}.{to_column}"),
            from_table,
            from_column,
            to_table,
            to_column,
            cardinality: Cardinality::default(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn on_delete(&self) -> ReferentialAction {
        self.on_delete.unwrap_or_default()
    }

    pub fn on_update(&self) -> ReferentialAction {
        self.on_update.unwrap_or_default()
    }

    /// Both ends name a table in `tables` and a column of that table.
    pub fn is_resolvable(&self, tables: &[Table]) -> bool {
        let has = |table: &str, column: &str| {
            tables
                .iter()
                .any(|t| t.name == table && t.column(column).is_some())
        };
        has(&self.from_table, &self.from_column) && has(&self.to_table, &self.to_column)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawDiagram")]
pub struct Diagram {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

#[derive(Deserialize)]
struct RawDiagram {
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

impl From<RawDiagram> for Diagram {
    fn from(raw: RawDiagram) -> Self {
        Self::new(raw.tables, raw.relationships)
    }
}

impl Diagram {
    /// Build a diagram, attaching each relationship to its referencing table.
    ///
    /// Relationships already present on a table are kept; the diagram-level
    /// list is the union of both, without duplicates.
    pub fn new(mut tables: Vec<Table>, relationships: Vec<Relationship>) -> Self {
        let mut all: Vec<Relationship> = tables
            .iter()
            .flat_map(|t| t.relationships.iter().cloned())
            .collect();
        for rel in relationships {
            if !all.contains(&rel) {
                all.push(rel);
            }
        }

        for table in &mut tables {
            table.relationships = all
                .iter()
                .filter(|r| r.from_table == table.name)
                .cloned()
                .collect();
            for column in &mut table.columns {
                if column.id.is_empty() {
                    column.id = format!("{}.{}", table.name, column.name);
                }
                if table.relationships.iter().any(|r| r.from_column == column.name) {
                    column.is_foreign_key = true;
                }
            }
            if table.id.is_empty() {
                table.id = table.name.clone();
            }
        }

        Self {
            tables,
            relationships: all,
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One generated output file. Paths use `/` separators regardless of host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: String,
    pub filename: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, filename: impl Into<String>, content: String) -> Self {
        Self {
            path: path.into(),
            filename: filename.into(),
            content,
        }
    }

    pub fn full_path(&self) -> String {
        if self.path.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.path.trim_end_matches('/'), self.filename)
        }
    }
}

/// Values interpolated into every artifact header and module path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkConfig {
    pub target_name: String,
    pub version: String,
    pub namespace: String,
    pub schema_name: String,
    pub description: String,
}

/// Partial config; set fields win over the plugin defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameworkConfigOverride {
    #[serde(alias = "targetName")]
    pub target_name: Option<String>,
    pub version: Option<String>,
    pub namespace: Option<String>,
    #[serde(alias = "schemaName")]
    pub schema_name: Option<String>,
    pub description: Option<String>,
}

impl FrameworkConfig {
    pub fn merged(&self, overrides: &FrameworkConfigOverride) -> Self {
        let pick = |over: &Option<String>, base: &String| over.clone().unwrap_or_else(|| base.clone());
        Self {
            target_name: pick(&overrides.target_name, &self.target_name),
            version: pick(&overrides.version, &self.version),
            namespace: pick(&overrides.namespace, &self.namespace),
            schema_name: pick(&overrides.schema_name, &self.schema_name),
            description: pick(&overrides.description, &self.description),
        }
    }
}
