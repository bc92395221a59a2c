//! Render contexts for the Yii3 artifacts.
//!
//! One [`TableContext`] is derived per table and shared by all of its
//! artifacts; each artifact then adds its own class name and namespace.

use super::types::{php_string, YiiTypeMapper};
use crate::model::{Cardinality, Column, FrameworkConfig, Relationship, Table};
use crate::naming;
use crate::sql::{is_expression_default, parse_bool, strip_quotes, TypeMapper, TypeMapping, ValueKind};
use serde::Serialize;
use tracing::warn;

/// Columns the framework fills in by itself (timestamps and user stamps).
pub const AUDIT_COLUMNS: &[&str] = &[
    "created_at",
    "updated_at",
    "deleted_at",
    "created_by",
    "updated_by",
    "deleted_by",
];

pub fn is_audit_column(name: &str) -> bool {
    AUDIT_COLUMNS.contains(&name.to_lowercase().as_str())
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnContext {
    pub name: String,
    pub property: String,
    pub label: String,
    pub php_type: String,
    /// `ColumnBuilder` call without the receiver, e.g. `string(255)`.
    pub builder: String,
    pub nullable: bool,
    pub required: bool,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub unique: bool,
    pub indexed: bool,
    pub auto_increment: bool,
    pub rules: Vec<String>,
    /// PHP literal for `defaultValue()`.
    pub default_value: Option<String>,
    /// Database-side default as a quoted PHP string, wrapped in an `Expression`.
    pub default_expression: Option<String>,
    /// Quoted PHP literal.
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationContext {
    /// Accessor suffix: `Category` for `getCategory()`.
    pub name: String,
    pub accessor: String,
    pub property: String,
    pub entity: String,
    pub table: String,
    /// `hasOne` or `hasMany`.
    pub kind: &'static str,
    pub many: bool,
    pub cardinality: &'static str,
    pub display: String,
    pub display_plural: String,
    /// Column on the related table.
    pub foreign_column: String,
    /// Column on this table.
    pub local_column: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyContext {
    pub name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub on_delete: &'static str,
    pub on_update: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexContext {
    pub name: String,
    pub column: String,
    pub unique: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableContext {
    pub config: FrameworkConfig,
    pub table: String,
    pub entity: String,
    pub variable: String,
    pub route: String,
    pub label: String,
    pub singular_label: String,
    pub comment: Option<String>,
    pub primary_key: String,
    pub primary_keys: Vec<String>,
    /// Every column, audit columns included; the migration creates them all.
    pub all_columns: Vec<ColumnContext>,
    /// Columns the entity-side artifacts work with.
    pub columns: Vec<ColumnContext>,
    pub editable_columns: Vec<ColumnContext>,
    pub required_columns: Vec<ColumnContext>,
    pub optional_columns: Vec<ColumnContext>,
    pub relations: Vec<RelationContext>,
    pub foreign_keys: Vec<ForeignKeyContext>,
    pub indexes: Vec<IndexContext>,
    pub migration_class: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub entity: String,
    pub variable: String,
    pub route: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagramContext {
    pub config: FrameworkConfig,
    pub tables: Vec<TableSummary>,
}

impl TableContext {
    /// `all_tables` is the full diagram, so inverse relations are found even
    /// when only a subset is being generated.
    pub fn build(
        table: &Table,
        all_tables: &[Table],
        config: &FrameworkConfig,
        migration_class: String,
    ) -> Self {
        let single_pk = table.primary_keys().count() == 1;
        let all_columns: Vec<ColumnContext> = table
            .columns
            .iter()
            .map(|c| column_context(c, single_pk))
            .collect();
        let columns: Vec<ColumnContext> = all_columns
            .iter()
            .filter(|c| !is_audit_column(&c.name))
            .cloned()
            .collect();
        let editable_columns: Vec<ColumnContext> = columns
            .iter()
            .filter(|c| !(c.primary_key && c.auto_increment))
            .cloned()
            .collect();
        let (required_columns, optional_columns): (Vec<_>, Vec<_>) =
            editable_columns.iter().cloned().partition(|c| c.required);

        let primary_keys: Vec<String> = table.primary_keys().map(|c| c.name.clone()).collect();

        Self {
            config: config.clone(),
            table: table.name.clone(),
            entity: naming::pascal_case(&table.name),
            variable: naming::camel_case(&naming::singularize(&table.name)),
            route: naming::route_segment(&table.name),
            label: naming::label(&table.name),
            singular_label: naming::label(&naming::singularize(&table.name)),
            comment: table.comment.as_deref().map(php_string),
            primary_key: primary_keys.first().cloned().unwrap_or_else(|| "id".to_string()),
            primary_keys,
            all_columns,
            columns,
            editable_columns,
            required_columns,
            optional_columns,
            relations: relations(table, all_tables),
            foreign_keys: table
                .relationships
                .iter()
                .filter(|rel| rel.is_resolvable(all_tables))
                .map(foreign_key)
                .collect(),
            indexes: indexes(table),
            migration_class,
        }
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            table: self.table.clone(),
            entity: self.entity.clone(),
            variable: self.variable.clone(),
            route: self.route.clone(),
            label: self.label.clone(),
        }
    }
}

fn column_context(column: &Column, single_pk: bool) -> ColumnContext {
    let mut mapping = YiiTypeMapper.map_type(&column.abstract_type);
    // A lone integer key becomes the framework's auto-increment primary key.
    if column.is_primary_key && single_pk && mapping.kind == ValueKind::Integer {
        let key_builder = match mapping.storage_type.as_str() {
            "bigInteger" | "bigPrimaryKey" => Some("bigPrimaryKey"),
            "integer" | "smallInteger" | "tinyInteger" | "primaryKey" => Some("primaryKey"),
            _ => None,
        };
        if let Some(builder) = key_builder {
            mapping.storage_type = builder.to_string();
            mapping.auto_increment = true;
        }
    }

    let (default_value, default_expression) = match column.default_value.as_deref() {
        Some(value) => php_default(value, mapping.kind),
        None => (None, None),
    };
    let has_default = default_value.is_some() || default_expression.is_some();
    let nullable = column.nullable && !column.is_primary_key;

    let mut rules = Vec::new();
    let required = !nullable && !has_default && !mapping.auto_increment;
    if required {
        rules.push("Required()".to_string());
    }
    rules.extend(mapping.validation_rules.iter().cloned());

    ColumnContext {
        name: column.name.clone(),
        property: naming::camel_case(&column.name),
        label: naming::label(&column.name),
        php_type: mapping.host_type.clone(),
        builder: builder_call(&mapping),
        nullable,
        required,
        primary_key: column.is_primary_key,
        foreign_key: column.is_foreign_key,
        unique: column.is_unique,
        indexed: column.is_indexed,
        auto_increment: mapping.auto_increment,
        rules,
        default_value,
        default_expression,
        comment: column.comment.as_deref().map(php_string),
    }
}

fn builder_call(mapping: &TypeMapping) -> String {
    format!(
        "{}({})",
        mapping.storage_type,
        mapping.length.as_deref().unwrap_or_default()
    )
}

/// Split a default into a PHP literal or a database-side expression.
fn php_default(value: &str, kind: ValueKind) -> (Option<String>, Option<String>) {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("null") {
        return (Some("null".to_string()), None);
    }
    if is_expression_default(trimmed) {
        return (None, Some(php_string(trimmed)));
    }

    let unquoted = strip_quotes(trimmed);
    let literal = match kind {
        ValueKind::Boolean => match parse_bool(unquoted) {
            Some(b) => b.to_string(),
            None => php_string(unquoted),
        },
        k if k.is_numeric() && unquoted.parse::<f64>().is_ok() => unquoted.to_string(),
        _ => php_string(unquoted),
    };
    (Some(literal), None)
}

fn foreign_key(rel: &Relationship) -> ForeignKeyContext {
    ForeignKeyContext {
        name: format!("fk_{}_{}", rel.from_table, rel.from_column),
        column: rel.from_column.clone(),
        ref_table: rel.to_table.clone(),
        ref_column: rel.to_column.clone(),
        on_delete: rel.on_delete().as_sql(),
        on_update: rel.on_update().as_sql(),
    }
}

fn indexes(table: &Table) -> Vec<IndexContext> {
    table
        .columns
        .iter()
        .filter(|c| !c.is_primary_key && (c.is_unique || c.is_indexed))
        .map(|c| IndexContext {
            name: format!(
                "{}_{}_{}",
                if c.is_unique { "uq" } else { "idx" },
                table.name,
                c.name
            ),
            column: c.name.clone(),
            unique: c.is_unique,
        })
        .collect()
}

/// Outgoing relationships become single-valued accessors; incoming ones are
/// single or multi-valued depending on cardinality.
fn relations(table: &Table, all_tables: &[Table]) -> Vec<RelationContext> {
    let mut relations: Vec<RelationContext> = table
        .relationships
        .iter()
        .filter(|rel| {
            let resolvable = rel.is_resolvable(all_tables);
            if !resolvable {
                warn!(relationship = %rel.id, "skipping relation with a missing table or column");
            }
            resolvable
        })
        .map(|rel| {
            let name = match rel.from_column.strip_suffix("_id") {
                Some(stem) if !stem.is_empty() => naming::pascal_case(stem),
                _ => naming::pascal_case(&naming::singularize(&rel.to_table)),
            };
            relation(name, &rel.to_table, false, rel.cardinality, &rel.to_column, &rel.from_column)
        })
        .collect();

    for rel in all_tables
        .iter()
        .flat_map(|t| &t.relationships)
        .filter(|r| r.to_table == table.name && r.is_resolvable(all_tables))
    {
        let singular = naming::singularize(&rel.from_table);
        let many = rel.cardinality != Cardinality::OneToOne;
        let name = if many {
            naming::pascal_case(&naming::pluralize(&singular))
        } else {
            naming::pascal_case(&singular)
        };
        relations.push(relation(
            name,
            &rel.from_table,
            many,
            rel.cardinality,
            &rel.from_column,
            &rel.to_column,
        ));
    }

    // Two relations to the same table would collide on the accessor name.
    let mut seen = std::collections::HashSet::new();
    for rel in &mut relations {
        let qualified = format!("{}By{}", rel.name, naming::pascal_case(&rel.foreign_column));
        let mut name = rel.name.clone();
        let mut n = 1;
        while !seen.insert(name.clone()) {
            name = if n == 1 {
                qualified.clone()
            } else {
                format!("{qualified}{n}")
            };
            n += 1;
        }
        if name != rel.name {
            rel.name = name;
            rel.accessor = format!("get{}", rel.name);
            rel.property = naming::camel_case(&rel.name);
        }
    }
    relations
}

fn relation(
    name: String,
    related_table: &str,
    many: bool,
    cardinality: Cardinality,
    foreign_column: &str,
    local_column: &str,
) -> RelationContext {
    let singular = naming::singularize(related_table);
    RelationContext {
        accessor: format!("get{name}"),
        property: naming::camel_case(&name),
        name,
        entity: naming::pascal_case(related_table),
        table: related_table.to_string(),
        kind: if many { "hasMany" } else { "hasOne" },
        many,
        cardinality: cardinality.as_str(),
        display: naming::label(&singular),
        display_plural: naming::label(&naming::pluralize(&singular)),
        foreign_column: foreign_column.to_string(),
        local_column: local_column.to_string(),
    }
}
