//! SQL dialect variants and their syntax rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    PostgreSql,
    MySql,
    Sqlite,
    SqlServer,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Self::PostgreSql,
        Self::MySql,
        Self::Sqlite,
        Self::SqlServer,
    ];

    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::PostgreSql),
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "sqlserver" | "mssql" | "tsql" => Some(Self::SqlServer),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PostgreSql => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
            Self::SqlServer => "SQL Server",
        }
    }

    pub fn quote_ident(self, ident: &str) -> String {
        match self {
            Self::PostgreSql | Self::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
            Self::SqlServer => format!("[{}]", ident.replace(']', "]]")),
        }
    }

    /// Table name, schema-qualified where the dialect has schemas.
    pub fn qualified(self, schema: Option<&str>, table: &str) -> String {
        match schema.filter(|s| !s.is_empty()) {
            Some(schema) if self != Self::Sqlite => {
                format!("{}.{}", self.quote_ident(schema), self.quote_ident(table))
            }
            _ => self.quote_ident(table),
        }
    }

    /// Whether foreign keys can be added after table creation (`ALTER TABLE .. ADD CONSTRAINT`).
    /// SQLite only accepts them inline.
    pub fn supports_alter_foreign_keys(self) -> bool {
        !matches!(self, Self::Sqlite)
    }

    pub fn supports_comment_statements(self) -> bool {
        matches!(self, Self::PostgreSql)
    }

    pub fn supports_inline_comments(self) -> bool {
        matches!(self, Self::MySql)
    }

    pub fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Self::PostgreSql, true) => "TRUE",
            (Self::PostgreSql, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Single-quoted string literal.
    pub fn string_literal(self, value: &str) -> String {
        let escaped = match self {
            Self::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
            _ => value.replace('\'', "''"),
        };
        format!("'{escaped}'")
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
