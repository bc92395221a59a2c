//! DDL script generation.
//!
//! Tables are emitted in the order given; callers that need foreign-key safe
//! creation order run [`crate::order::order_tables`] first.

use super::types::{TypeMapper, TypeMapping, ValueKind};
use super::Dialect;
use crate::measure::{max_width, pad_right};
use crate::model::{Column, ReferentialAction, Relationship, Table};
use std::fmt::Write;
use tracing::{debug, warn};

/// Export `tables` as one DDL script for `dialect`.
pub fn export_schema(
    tables: &[Table],
    relationships: &[Relationship],
    dialect: Dialect,
    schema_name: Option<&str>,
) -> String {
    SqlExporter::new(dialect, schema_name).export(tables, relationships)
}

pub struct SqlExporter<'s> {
    dialect: Dialect,
    schema: Option<&'s str>,
}

impl<'s> SqlExporter<'s> {
    pub fn new(dialect: Dialect, schema: Option<&'s str>) -> Self {
        Self {
            dialect,
            schema: schema.filter(|s| !s.is_empty()),
        }
    }

    pub fn export(&self, tables: &[Table], relationships: &[Relationship]) -> String {
        let mut out = String::new();

        writeln!(out, "-- Generated by erdgen").unwrap();
        writeln!(out, "-- Dialect: {}", self.dialect).unwrap();
        if let Some(schema) = self.schema {
            writeln!(out, "-- Schema: {schema}").unwrap();
        }
        writeln!(out).unwrap();

        if let Some(schema) = self.schema {
            match self.dialect {
                Dialect::PostgreSql => {
                    writeln!(
                        out,
                        "CREATE SCHEMA IF NOT EXISTS {};\n",
                        self.dialect.quote_ident(schema)
                    )
                    .unwrap();
                }
                Dialect::MySql => {
                    writeln!(
                        out,
                        "CREATE DATABASE IF NOT EXISTS {};\n",
                        self.dialect.quote_ident(schema)
                    )
                    .unwrap();
                }
                Dialect::Sqlite | Dialect::SqlServer => {}
            }
        }

        for table in tables {
            let foreign_keys: Vec<&Relationship> = relationships
                .iter()
                .filter(|r| r.from_table == table.name)
                .filter(|r| {
                    let resolvable = r.is_resolvable(tables);
                    if !resolvable {
                        warn!(relationship = %r.id, "skipping foreign key with dangling reference");
                    }
                    resolvable
                })
                .collect();

            debug!(table = %table.name, dialect = %self.dialect, "exporting table");
            self.write_table(&mut out, table, &foreign_keys);
        }

        out
    }

    fn table_name(&self, table: &str) -> String {
        self.dialect.qualified(self.schema, table)
    }

    fn write_table(&self, out: &mut String, table: &Table, foreign_keys: &[&Relationship]) {
        let dialect = self.dialect;
        let table_name = self.table_name(&table.name);

        writeln!(out, "-- Table: {}", table.name).unwrap();
        if let Some(comment) = &table.comment {
            writeln!(out, "-- {}", comment.replace('\n', " ")).unwrap();
        }

        let pk_columns: Vec<&Column> = table.primary_keys().collect();
        let inline_pk = pk_columns.len() == 1;

        let mapped: Vec<(&Column, TypeMapping)> = table
            .columns
            .iter()
            .map(|c| (c, dialect.map_type(&c.abstract_type)))
            .collect();
        let quoted_names: Vec<String> = mapped
            .iter()
            .map(|(c, _)| dialect.quote_ident(&c.name))
            .collect();
        let types: Vec<String> = mapped.iter().map(|(_, m)| m.sql_type()).collect();
        let name_width = max_width(quoted_names.iter().map(String::as_str));
        let type_width = max_width(types.iter().map(String::as_str));

        let mut lines: Vec<String> = Vec::new();
        for (((column, mapping), quoted), typ) in mapped.iter().zip(&quoted_names).zip(&types) {
            let mut line = format!(
                "    {} {}",
                pad_right(quoted, name_width),
                pad_right(typ, type_width)
            );
            let constraints = self.column_constraints(column, mapping, inline_pk);
            if !constraints.is_empty() {
                line.push(' ');
                line.push_str(&constraints.join(" "));
            }
            lines.push(line.trim_end().to_string());
        }

        if pk_columns.len() > 1 {
            let cols: Vec<String> = pk_columns.iter().map(|c| dialect.quote_ident(&c.name)).collect();
            lines.push(format!("    PRIMARY KEY ({})", cols.join(", ")));
        }

        if !dialect.supports_alter_foreign_keys() {
            for rel in foreign_keys {
                lines.push(format!("    {}", self.foreign_key_clause(rel)));
            }
        }

        writeln!(out, "CREATE TABLE {table_name} (").unwrap();
        writeln!(out, "{}", lines.join(",\n")).unwrap();
        match (dialect, &table.comment) {
            (Dialect::MySql, Some(comment)) => writeln!(
                out,
                ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT={};",
                dialect.string_literal(comment)
            )
            .unwrap(),
            (Dialect::MySql, None) => {
                writeln!(out, ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;").unwrap()
            }
            _ => writeln!(out, ");").unwrap(),
        }

        if dialect.supports_alter_foreign_keys() {
            for rel in foreign_keys {
                writeln!(
                    out,
                    "ALTER TABLE {} ADD CONSTRAINT {} {};",
                    table_name,
                    dialect.quote_ident(&format!("fk_{}_{}", table.name, rel.from_column)),
                    self.foreign_key_clause(rel)
                )
                .unwrap();
            }
        }

        for column in table.columns.iter().filter(|c| !c.is_primary_key) {
            if column.is_unique || column.is_indexed {
                let (keyword, prefix) = if column.is_unique {
                    ("UNIQUE INDEX", "uq")
                } else {
                    ("INDEX", "idx")
                };
                writeln!(
                    out,
                    "CREATE {} {} ON {} ({});",
                    keyword,
                    dialect.quote_ident(&format!("{}_{}_{}", prefix, table.name, column.name)),
                    table_name,
                    dialect.quote_ident(&column.name)
                )
                .unwrap();
            }
        }

        if dialect.supports_comment_statements() {
            if let Some(comment) = &table.comment {
                writeln!(
                    out,
                    "COMMENT ON TABLE {} IS {};",
                    table_name,
                    dialect.string_literal(comment)
                )
                .unwrap();
            }
            for column in &table.columns {
                if let Some(comment) = &column.comment {
                    writeln!(
                        out,
                        "COMMENT ON COLUMN {}.{} IS {};",
                        table_name,
                        dialect.quote_ident(&column.name),
                        dialect.string_literal(comment)
                    )
                    .unwrap();
                }
            }
        }

        writeln!(out).unwrap();
    }

    fn column_constraints(
        &self,
        column: &Column,
        mapping: &TypeMapping,
        inline_pk: bool,
    ) -> Vec<String> {
        let dialect = self.dialect;
        let mut parts = Vec::new();

        if !column.nullable || column.is_primary_key {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = &column.default_value {
            parts.push(format!("DEFAULT {}", format_default(default, mapping.kind, dialect)));
        }
        if mapping.auto_increment {
            match dialect {
                Dialect::MySql => parts.push("AUTO_INCREMENT".to_string()),
                Dialect::SqlServer => parts.push("IDENTITY(1,1)".to_string()),
                Dialect::PostgreSql | Dialect::Sqlite => {}
            }
        }
        if column.is_primary_key && inline_pk {
            parts.push("PRIMARY KEY".to_string());
            if dialect == Dialect::Sqlite && mapping.auto_increment {
                parts.push("AUTOINCREMENT".to_string());
            }
        }
        if dialect.supports_inline_comments() {
            if let Some(comment) = &column.comment {
                parts.push(format!("COMMENT {}", dialect.string_literal(comment)));
            }
        }
        parts
    }

    fn foreign_key_clause(&self, rel: &Relationship) -> String {
        let dialect = self.dialect;
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            dialect.quote_ident(&rel.from_column),
            self.table_name(&rel.to_table),
            dialect.quote_ident(&rel.to_column),
            action_sql(rel.on_delete(), dialect),
            action_sql(rel.on_update(), dialect)
        )
    }
}

/// SQL Server has no RESTRICT; NO ACTION is its equivalent.
fn action_sql(action: ReferentialAction, dialect: Dialect) -> &'static str {
    match (action, dialect) {
        (ReferentialAction::Restrict, Dialect::SqlServer) => ReferentialAction::NoAction.as_sql(),
        _ => action.as_sql(),
    }
}

const SQL_KEYWORD_DEFAULTS: &[&str] = &[
    "current_timestamp",
    "current_date",
    "current_time",
    "localtimestamp",
    "localtime",
];

/// Render a default value as a literal: numbers and booleans bare, expressions
/// verbatim, everything else quoted and escaped.
pub fn format_default(value: &str, kind: ValueKind, dialect: Dialect) -> String {
    let trimmed = value.trim();
    let lower = trimmed.to_lowercase();

    if lower == "null" {
        return "NULL".to_string();
    }
    if SQL_KEYWORD_DEFAULTS.contains(&lower.as_str()) {
        return trimmed.to_uppercase();
    }
    if is_function_call(trimmed) {
        return trimmed.to_string();
    }

    let unquoted = strip_quotes(trimmed);
    match kind {
        ValueKind::Boolean => match parse_bool(unquoted) {
            Some(b) => dialect.bool_literal(b).to_string(),
            None => dialect.string_literal(unquoted),
        },
        k if k.is_numeric() && unquoted.parse::<f64>().is_ok() => unquoted.to_string(),
        _ => dialect.string_literal(unquoted),
    }
}

/// Defaults evaluated by the database: SQL keywords and function calls.
pub(crate) fn is_expression_default(value: &str) -> bool {
    let trimmed = value.trim();
    SQL_KEYWORD_DEFAULTS.contains(&trimmed.to_lowercase().as_str()) || is_function_call(trimmed)
}

fn is_function_call(value: &str) -> bool {
    match value.split_once('(') {
        Some((name, _)) => {
            value.ends_with(')')
                && !name.is_empty()
                && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        }
        None => false,
    }
}

pub(crate) fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" => Some(true),
        "false" | "0" | "no" | "off" | "f" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, Column, Diagram, ReferentialAction, Relationship, Table};

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                Column::primary("id", "uuid"),
                Column::new("email", "varchar(255)").not_null(),
            ],
        )
    }

    fn shop() -> Diagram {
        let mut category_id = Column::new("category_id", "int").not_null();
        category_id.is_indexed = true;
        let mut sku = Column::new("sku", "varchar(32)");
        sku.is_unique = true;
        Diagram::new(
            vec![
                Table::new("categories", vec![Column::primary("id", "serial")]),
                Table::new(
                    "products",
                    vec![
                        Column::primary("id", "serial"),
                        category_id,
                        sku,
                        Column::new("active", "boolean").with_default("true"),
                        Column::new("price", "decimal(10,2)").with_default("9.5"),
                        Column::new("note", "text").with_default("it's new"),
                        Column::new("added_at", "timestamp").with_default("CURRENT_TIMESTAMP"),
                    ],
                ),
            ],
            vec![Relationship::new("products", "category_id", "categories", "id")
                .with_cardinality(Cardinality::OneToMany)],
        )
    }

    #[test]
    fn test_single_table_postgres() {
        let sql = export_schema(&[users()], &[], Dialect::PostgreSql, None);

        assert_eq!(sql.matches("CREATE TABLE").count(), 1);
        assert!(sql.contains("CREATE TABLE \"users\" ("));
        assert!(sql.contains("\"id\"    uuid         NOT NULL PRIMARY KEY,"));
        assert!(sql.contains("\"email\" varchar(255) NOT NULL\n"));
        assert!(!sql.contains("FOREIGN KEY"));
        assert!(sql.contains("-- Table: users\n"));
    }

    #[test]
    fn test_foreign_keys_postgres() {
        let diagram = shop();
        let sql = export_schema(&diagram.tables, &diagram.relationships, Dialect::PostgreSql, None);

        assert!(sql.contains(
            "ALTER TABLE \"products\" ADD CONSTRAINT \"fk_products_category_id\" FOREIGN KEY (\"category_id\") REFERENCES \"categories\" (\"id\") ON DELETE RESTRICT ON UPDATE RESTRICT;"
        ));
        assert!(sql.contains("CREATE INDEX \"idx_products_category_id\" ON \"products\" (\"category_id\");"));
        assert!(sql.contains("CREATE UNIQUE INDEX \"uq_products_sku\" ON \"products\" (\"sku\");"));
        assert!(sql.contains("DEFAULT TRUE"));
        assert!(sql.contains("DEFAULT 9.5"));
        assert!(sql.contains("DEFAULT 'it''s new'"));
        assert!(sql.contains("DEFAULT CURRENT_TIMESTAMP"));
        assert!(sql.contains("\"id\"          serial        NOT NULL PRIMARY KEY"));
    }

    #[test]
    fn test_input_order_is_kept() {
        let diagram = shop();
        let reversed: Vec<Table> = diagram.tables.iter().rev().cloned().collect();
        let sql = export_schema(&reversed, &diagram.relationships, Dialect::PostgreSql, None);

        let products = sql.find("CREATE TABLE \"products\"").unwrap();
        let categories = sql.find("CREATE TABLE \"categories\"").unwrap();
        assert!(products < categories);
    }

    #[test]
    fn test_mysql_dialect() {
        let mut diagram = shop();
        diagram.tables[1].relationships[0].on_delete = Some(ReferentialAction::Cascade);
        diagram.tables[1].columns[1].comment = Some("Owning category".to_string());
        let rels = crate::order::relationships_of(&diagram.tables);
        let sql = export_schema(&diagram.tables, &rels, Dialect::MySql, Some("shop"));

        assert!(sql.contains("CREATE DATABASE IF NOT EXISTS `shop`;"));
        assert!(sql.contains("CREATE TABLE `shop`.`products` ("));
        assert!(sql.contains("AUTO_INCREMENT PRIMARY KEY"));
        assert!(sql.contains("DEFAULT 1"));
        assert!(sql.contains("COMMENT 'Owning category'"));
        assert!(sql.contains("ON DELETE CASCADE ON UPDATE RESTRICT"));
        assert!(sql.contains(") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;"));
    }

    #[test]
    fn test_sqlite_inlines_foreign_keys() {
        let diagram = shop();
        let sql = export_schema(&diagram.tables, &diagram.relationships, Dialect::Sqlite, Some("ignored"));

        assert!(!sql.contains("ALTER TABLE"));
        assert!(sql.contains(
            "    FOREIGN KEY (\"category_id\") REFERENCES \"categories\" (\"id\") ON DELETE RESTRICT ON UPDATE RESTRICT\n);"
        ));
        assert!(sql.contains("PRIMARY KEY AUTOINCREMENT"));
        assert!(!sql.contains("\"ignored\""));
    }

    #[test]
    fn test_sqlserver_dialect() {
        let diagram = shop();
        let sql = export_schema(&diagram.tables, &diagram.relationships, Dialect::SqlServer, None);

        assert!(sql.contains("CREATE TABLE [products] ("));
        assert!(sql.contains("IDENTITY(1,1) PRIMARY KEY"));
        assert!(sql.contains("ON DELETE NO ACTION ON UPDATE NO ACTION"));
        assert!(!sql.contains("RESTRICT"));
    }

    #[test]
    fn test_composite_primary_key_and_comments() {
        let mut table = Table::new(
            "post_tags",
            vec![Column::primary("post_id", "int"), Column::primary("tag_id", "int")],
        );
        table.comment = Some("Join table".to_string());
        table.columns[0].comment = Some("Post".to_string());
        let sql = export_schema(&[table], &[], Dialect::PostgreSql, None);

        assert!(sql.contains("    PRIMARY KEY (\"post_id\", \"tag_id\")"));
        assert!(!sql.contains("NOT NULL PRIMARY KEY"));
        assert!(sql.contains("COMMENT ON TABLE \"post_tags\" IS 'Join table';"));
        assert!(sql.contains("COMMENT ON COLUMN \"post_tags\".\"post_id\" IS 'Post';"));
    }

    #[test]
    fn test_dangling_relationship_skipped() {
        let table = Table::new(
            "posts",
            vec![Column::primary("id", "int"), Column::new("author_id", "int")],
        );
        let rels = vec![Relationship::new("posts", "author_id", "authors", "id")];
        let sql = export_schema(&[table], &rels, Dialect::PostgreSql, None);
        assert!(!sql.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_missing_column_skips_foreign_key() {
        let users = Table::new("users", vec![Column::primary("id", "int")]);
        let posts = Table::new(
            "posts",
            vec![Column::primary("id", "int"), Column::new("user_id", "int")],
        );
        let rels = vec![
            Relationship::new("posts", "user_id", "users", "uuid"),
            Relationship::new("posts", "author_id", "users", "id"),
            Relationship::new("posts", "user_id", "users", "id"),
        ];
        let sql = export_schema(&[users, posts], &rels, Dialect::PostgreSql, None);

        assert_eq!(sql.matches("FOREIGN KEY").count(), 1);
        assert!(sql.contains("REFERENCES \"users\" (\"id\")"));
        assert!(!sql.contains("uuid"));
        assert!(!sql.contains("author_id"));
    }

    #[test]
    fn test_format_default() {
        assert_eq!(format_default("42", ValueKind::Integer, Dialect::MySql), "42");
        assert_eq!(format_default("42", ValueKind::Text, Dialect::MySql), "'42'");
        assert_eq!(format_default("'draft'", ValueKind::Enum, Dialect::PostgreSql), "'draft'");
        assert_eq!(format_default("false", ValueKind::Boolean, Dialect::SqlServer), "0");
        assert_eq!(format_default("null", ValueKind::Text, Dialect::Sqlite), "NULL");
        assert_eq!(format_default("now()", ValueKind::DateTime, Dialect::PostgreSql), "now()");
        assert_eq!(
            format_default("2024-01-01", ValueKind::Date, Dialect::PostgreSql),
            "'2024-01-01'"
        );
        assert_eq!(format_default("a b (c)", ValueKind::Text, Dialect::PostgreSql), "'a b (c)'");
    }
}
