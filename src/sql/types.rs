//! Abstract column type to dialect type mapping.
//!
//! Every dialect owns its own lookup table; they are deliberately not derived
//! from one another.

use super::Dialect;
use serde::Serialize;

/// Abstract type split into its lower-cased base and raw argument list.
///
/// `VarChar(255)` → base `varchar`, args `255`; `decimal(10, 2)` → `decimal`, `10,2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbstractType {
    pub base: String,
    pub args: Option<String>,
}

impl AbstractType {
    pub fn parse(input: &str) -> Self {
        let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.split_once('(') {
            Some((base, rest)) => {
                let args = rest.rsplit_once(')').map_or(rest, |(inner, _)| inner);
                let args: String = args
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .collect::<Vec<_>>()
                    .join(",");
                Self {
                    base: base.trim().to_lowercase(),
                    args: (!args.is_empty()).then_some(args),
                }
            }
            None => Self {
                base: normalized.to_lowercase(),
                args: None,
            },
        }
    }

    /// First numeric argument, e.g. the length of `varchar(255)`.
    pub fn size(&self) -> Option<u32> {
        self.args
            .as_deref()
            .and_then(|a| a.split(',').next())
            .and_then(|a| a.parse().ok())
    }

    /// Quoted members of `enum('a','b')`, unquoted.
    pub fn members(&self) -> Vec<String> {
        self.args
            .as_deref()
            .map(|a| {
                a.split(',')
                    .map(|m| m.trim().trim_matches('\'').trim_matches('"').to_string())
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Value category of a mapped type; drives default-literal formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Integer,
    Decimal,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
    Binary,
    Json,
    Uuid,
    Enum,
}

impl ValueKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Float)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMapping {
    pub storage_type: String,
    /// Length/precision re-attached when rendering DDL.
    pub length: Option<String>,
    pub host_type: String,
    pub kind: ValueKind,
    pub validation_rules: Vec<String>,
    pub auto_increment: bool,
}

impl TypeMapping {
    pub fn new(storage_type: &str, kind: ValueKind) -> Self {
        Self {
            storage_type: storage_type.to_string(),
            length: None,
            host_type: host_type(kind).to_string(),
            kind,
            validation_rules: Vec::new(),
            auto_increment: false,
        }
    }

    pub fn with_length(mut self, length: Option<String>) -> Self {
        self.length = length;
        self
    }

    /// Keep the caller's argument list, or fall back to `default`.
    pub fn with_length_or(self, args: &Option<String>, default: &str) -> Self {
        let length = args.clone().unwrap_or_else(|| default.to_string());
        self.with_length(Some(length))
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_host_type(mut self, host_type: &str) -> Self {
        self.host_type = host_type.to_string();
        self
    }

    pub fn with_rules(mut self, rules: Vec<String>) -> Self {
        self.validation_rules = rules;
        self
    }

    /// Storage type with its length re-attached: `varchar` + `255` → `varchar(255)`.
    pub fn sql_type(&self) -> String {
        match &self.length {
            Some(length) => format!("{}({})", self.storage_type, length),
            None => self.storage_type.clone(),
        }
    }
}

/// Maps an abstract column type to a concrete type descriptor. Total: unknown
/// input yields the mapper's fallback, never an error.
pub trait TypeMapper {
    fn map_type(&self, abstract_type: &str) -> TypeMapping;
}

impl TypeMapper for Dialect {
    fn map_type(&self, abstract_type: &str) -> TypeMapping {
        let parsed = AbstractType::parse(abstract_type);
        let mapping = match self {
            Dialect::PostgreSql => map_postgres_type(&parsed),
            Dialect::MySql => map_mysql_type(&parsed),
            Dialect::Sqlite => map_sqlite_type(&parsed),
            Dialect::SqlServer => map_sqlserver_type(&parsed),
        };
        with_rules(mapping, &parsed)
    }
}

fn host_type(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Text | ValueKind::Enum => "String",
        ValueKind::Integer => "i64",
        ValueKind::Decimal => "Decimal",
        ValueKind::Float => "f64",
        ValueKind::Boolean => "bool",
        ValueKind::Date => "NaiveDate",
        ValueKind::DateTime => "NaiveDateTime",
        ValueKind::Time => "NaiveTime",
        ValueKind::Binary => "Vec<u8>",
        ValueKind::Json => "serde_json::Value",
        ValueKind::Uuid => "Uuid",
    }
}

fn with_rules(mut mapping: TypeMapping, parsed: &AbstractType) -> TypeMapping {
    let mut rules = Vec::new();
    match mapping.kind {
        ValueKind::Text => {
            rules.push("string".to_string());
            if let Some(size) = parsed.size() {
                rules.push(format!("max:{size}"));
            }
        }
        ValueKind::Integer => rules.push("integer".to_string()),
        ValueKind::Decimal | ValueKind::Float => rules.push("number".to_string()),
        ValueKind::Boolean => rules.push("boolean".to_string()),
        ValueKind::Date => rules.push("date".to_string()),
        ValueKind::DateTime => rules.push("datetime".to_string()),
        ValueKind::Time => rules.push("time".to_string()),
        ValueKind::Json => rules.push("json".to_string()),
        ValueKind::Uuid => rules.push("uuid".to_string()),
        ValueKind::Enum => {
            let members = parsed.members();
            if !members.is_empty() {
                rules.push(format!("in:{}", members.join(",")));
            }
        }
        ValueKind::Binary => {}
    }
    mapping.validation_rules = rules;
    mapping
}

fn map_postgres_type(t: &AbstractType) -> TypeMapping {
    use ValueKind::*;
    match t.base.as_str() {
        // String types
        "varchar" | "character varying" | "string" | "nvarchar" => {
            TypeMapping::new("varchar", Text).with_length(t.args.clone())
        }
        "char" | "character" | "nchar" => TypeMapping::new("char", Text).with_length(t.args.clone()),
        "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => TypeMapping::new("text", Text),

        // Integer types
        "tinyint" | "smallint" | "int2" | "year" => TypeMapping::new("smallint", Integer),
        "mediumint" | "int" | "integer" | "int4" => TypeMapping::new("integer", Integer),
        "bigint" | "int8" => TypeMapping::new("bigint", Integer),
        "smallserial" => TypeMapping::new("smallserial", Integer).auto_increment(),
        "serial" | "increments" => TypeMapping::new("serial", Integer).auto_increment(),
        "bigserial" | "bigincrements" => TypeMapping::new("bigserial", Integer).auto_increment(),

        // Fixed / floating point
        "decimal" | "numeric" | "money" => {
            TypeMapping::new("numeric", Decimal).with_length(t.args.clone())
        }
        "float" | "real" | "float4" => TypeMapping::new("real", Float),
        "double" | "double precision" | "float8" => TypeMapping::new("double precision", Float),

        // Boolean
        "boolean" | "bool" | "bit" => TypeMapping::new("boolean", Boolean),

        // Date/time
        "date" => TypeMapping::new("date", Date),
        "datetime" | "timestamp" => TypeMapping::new("timestamp", DateTime),
        "timestamptz" | "timestamp with time zone" => TypeMapping::new("timestamptz", DateTime),
        "time" => TypeMapping::new("time", Time),
        "interval" => TypeMapping::new("interval", Text),

        // Binary
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea" => {
            TypeMapping::new("bytea", Binary)
        }

        // JSON / UUID
        "json" => TypeMapping::new("json", Json),
        "jsonb" => TypeMapping::new("jsonb", Json),
        "uuid" | "guid" => TypeMapping::new("uuid", Uuid),

        // Enum/Set: no inline enum type
        "enum" | "set" => TypeMapping::new("varchar", Enum).with_length(Some("255".to_string())),

        "inet" | "cidr" => TypeMapping::new("inet", Text),

        // Default: safe text
        _ => TypeMapping::new("text", Text),
    }
}

fn map_mysql_type(t: &AbstractType) -> TypeMapping {
    use ValueKind::*;
    match t.base.as_str() {
        // String types
        "varchar" | "character varying" | "string" | "nvarchar" => {
            TypeMapping::new("varchar", Text).with_length_or(&t.args, "255")
        }
        "char" | "character" | "nchar" => TypeMapping::new("char", Text).with_length(t.args.clone()),
        "text" | "clob" => TypeMapping::new("text", Text),
        "tinytext" => TypeMapping::new("tinytext", Text),
        "mediumtext" => TypeMapping::new("mediumtext", Text),
        "longtext" => TypeMapping::new("longtext", Text),

        // Integer types
        "tinyint" => TypeMapping::new("tinyint", Integer),
        "smallint" | "int2" => TypeMapping::new("smallint", Integer),
        "mediumint" => TypeMapping::new("mediumint", Integer),
        "int" | "integer" | "int4" => TypeMapping::new("int", Integer),
        "bigint" | "int8" => TypeMapping::new("bigint", Integer),
        "serial" | "smallserial" | "increments" => TypeMapping::new("int", Integer).auto_increment(),
        "bigserial" | "bigincrements" => TypeMapping::new("bigint", Integer).auto_increment(),

        // Fixed / floating point
        "decimal" | "numeric" | "money" => {
            TypeMapping::new("decimal", Decimal).with_length_or(&t.args, "10,2")
        }
        "float" | "real" | "float4" => TypeMapping::new("float", Float),
        "double" | "double precision" | "float8" => TypeMapping::new("double", Float),

        // No native boolean
        "boolean" | "bool" | "bit" => {
            TypeMapping::new("tinyint", Boolean).with_length(Some("1".to_string()))
        }

        // Date/time
        "date" => TypeMapping::new("date", Date),
        "datetime" => TypeMapping::new("datetime", DateTime),
        "timestamp" | "timestamptz" | "timestamp with time zone" => {
            TypeMapping::new("timestamp", DateTime)
        }
        "time" => TypeMapping::new("time", Time),
        "year" => TypeMapping::new("year", Integer),

        // Binary
        "binary" => TypeMapping::new("binary", Binary).with_length(t.args.clone()),
        "varbinary" => TypeMapping::new("varbinary", Binary).with_length_or(&t.args, "255"),
        "blob" => TypeMapping::new("blob", Binary),
        "tinyblob" => TypeMapping::new("tinyblob", Binary),
        "mediumblob" => TypeMapping::new("mediumblob", Binary),
        "longblob" | "bytea" => TypeMapping::new("longblob", Binary),

        // JSON / UUID
        "json" | "jsonb" => TypeMapping::new("json", Json),
        "uuid" | "guid" => TypeMapping::new("char", Uuid).with_length(Some("36".to_string())),

        // Enum/Set keep their member list
        "enum" => TypeMapping::new("enum", Enum).with_length(t.args.clone()),
        "set" => TypeMapping::new("set", Enum).with_length(t.args.clone()),

        // Default
        _ => TypeMapping::new("varchar", Text).with_length(Some("255".to_string())),
    }
}

fn map_sqlite_type(t: &AbstractType) -> TypeMapping {
    use ValueKind::*;
    match t.base.as_str() {
        // Text affinity
        "varchar" | "character varying" | "string" | "nvarchar" | "char" | "character"
        | "nchar" => TypeMapping::new("text", Text),
        "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => TypeMapping::new("text", Text),
        "interval" | "inet" | "cidr" => TypeMapping::new("text", Text),

        // Integer affinity
        "tinyint" | "smallint" | "int2" | "mediumint" | "int" | "integer" | "int4" | "bigint"
        | "int8" | "year" => TypeMapping::new("integer", Integer),
        "serial" | "smallserial" | "bigserial" | "increments" | "bigincrements" => {
            TypeMapping::new("integer", Integer).auto_increment()
        }

        // Numeric / real affinity
        "decimal" | "numeric" | "money" => TypeMapping::new("numeric", Decimal),
        "float" | "real" | "float4" | "double" | "double precision" | "float8" => {
            TypeMapping::new("real", Float)
        }

        // No native boolean
        "boolean" | "bool" | "bit" => TypeMapping::new("integer", Boolean),

        // Date/time stored as ISO-8601 text
        "date" => TypeMapping::new("text", Date),
        "datetime" | "timestamp" | "timestamptz" | "timestamp with time zone" => {
            TypeMapping::new("text", DateTime)
        }
        "time" => TypeMapping::new("text", Time),

        // Binary
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea" => {
            TypeMapping::new("blob", Binary)
        }

        "json" | "jsonb" => TypeMapping::new("text", Json),
        "uuid" | "guid" => TypeMapping::new("text", Uuid),
        "enum" | "set" => TypeMapping::new("text", Enum),

        _ => TypeMapping::new("text", Text),
    }
}

fn map_sqlserver_type(t: &AbstractType) -> TypeMapping {
    use ValueKind::*;
    match t.base.as_str() {
        // String types
        "varchar" | "character varying" | "string" | "nvarchar" => {
            TypeMapping::new("nvarchar", Text).with_length_or(&t.args, "255")
        }
        "char" | "character" | "nchar" => TypeMapping::new("nchar", Text).with_length(t.args.clone()),
        "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => {
            TypeMapping::new("nvarchar", Text).with_length(Some("max".to_string()))
        }

        // Integer types
        "tinyint" => TypeMapping::new("tinyint", Integer),
        "smallint" | "int2" | "year" => TypeMapping::new("smallint", Integer),
        "mediumint" | "int" | "integer" | "int4" => TypeMapping::new("int", Integer),
        "bigint" | "int8" => TypeMapping::new("bigint", Integer),
        "serial" | "smallserial" | "increments" => TypeMapping::new("int", Integer).auto_increment(),
        "bigserial" | "bigincrements" => TypeMapping::new("bigint", Integer).auto_increment(),

        // Fixed / floating point
        "decimal" | "numeric" => {
            TypeMapping::new("decimal", Decimal).with_length_or(&t.args, "18,2")
        }
        "money" => TypeMapping::new("money", Decimal),
        "float" | "double" | "double precision" | "float8" => TypeMapping::new("float", Float),
        "real" | "float4" => TypeMapping::new("real", Float),

        "boolean" | "bool" | "bit" => TypeMapping::new("bit", Boolean),

        // Date/time
        "date" => TypeMapping::new("date", Date),
        "datetime" | "timestamp" => TypeMapping::new("datetime2", DateTime),
        "timestamptz" | "timestamp with time zone" => TypeMapping::new("datetimeoffset", DateTime),
        "time" => TypeMapping::new("time", Time),
        "interval" => TypeMapping::new("nvarchar", Text).with_length(Some("64".to_string())),

        // Binary
        "binary" => TypeMapping::new("binary", Binary).with_length(t.args.clone()),
        "varbinary" => TypeMapping::new("varbinary", Binary).with_length_or(&t.args, "max"),
        "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea" => {
            TypeMapping::new("varbinary", Binary).with_length(Some("max".to_string()))
        }

        "json" | "jsonb" => TypeMapping::new("nvarchar", Json).with_length(Some("max".to_string())),
        "uuid" | "guid" => TypeMapping::new("uniqueidentifier", Uuid),
        "enum" | "set" => TypeMapping::new("nvarchar", Enum).with_length(Some("255".to_string())),

        _ => TypeMapping::new("nvarchar", Text).with_length(Some("max".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_abstract_type() {
        let t = AbstractType::parse("  VarChar( 255 ) ");
        assert_eq!(t.base, "varchar");
        assert_eq!(t.args.as_deref(), Some("255"));
        assert_eq!(t.size(), Some(255));

        let t = AbstractType::parse("decimal(10, 2)");
        assert_eq!(t.args.as_deref(), Some("10,2"));

        let t = AbstractType::parse("Double   Precision");
        assert_eq!(t.base, "double precision");
        assert_eq!(t.args, None);

        let t = AbstractType::parse("enum('draft', 'live')");
        assert_eq!(t.members(), vec!["draft", "live"]);
    }

    #[test]
    fn test_varchar_round_trip() {
        let mapping = Dialect::PostgreSql.map_type("varchar(255)");
        assert_eq!(mapping.storage_type, "varchar");
        assert_eq!(mapping.length.as_deref(), Some("255"));
        assert_eq!(mapping.sql_type(), "varchar(255)");
        assert_eq!(mapping.validation_rules, vec!["string", "max:255"]);
    }

    #[rstest]
    #[case(Dialect::PostgreSql, "boolean", "boolean")]
    #[case(Dialect::MySql, "boolean", "tinyint(1)")]
    #[case(Dialect::Sqlite, "boolean", "integer")]
    #[case(Dialect::SqlServer, "boolean", "bit")]
    #[case(Dialect::PostgreSql, "uuid", "uuid")]
    #[case(Dialect::MySql, "uuid", "char(36)")]
    #[case(Dialect::SqlServer, "uuid", "uniqueidentifier")]
    #[case(Dialect::MySql, "varchar", "varchar(255)")]
    #[case(Dialect::SqlServer, "text", "nvarchar(max)")]
    #[case(Dialect::PostgreSql, "decimal(10,2)", "numeric(10,2)")]
    #[case(Dialect::MySql, "enum('a','b')", "enum('a','b')")]
    #[case(Dialect::PostgreSql, "jsonb", "jsonb")]
    #[case(Dialect::MySql, "bytea", "longblob")]
    #[case(Dialect::SqlServer, "timestamptz", "datetimeoffset")]
    fn test_dialect_tables(#[case] dialect: Dialect, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(dialect.map_type(input).sql_type(), expected);
    }

    #[test]
    fn test_unknown_type_falls_back() {
        assert_eq!(Dialect::PostgreSql.map_type("geometry").sql_type(), "text");
        assert_eq!(Dialect::MySql.map_type("geometry").sql_type(), "varchar(255)");
        assert_eq!(Dialect::Sqlite.map_type("").sql_type(), "text");
        assert_eq!(Dialect::SqlServer.map_type("((").sql_type(), "nvarchar(max)");
        assert_eq!(Dialect::PostgreSql.map_type("geometry").kind, ValueKind::Text);
    }

    #[test]
    fn test_serial_is_auto_increment() {
        for dialect in Dialect::ALL {
            assert!(dialect.map_type("serial").auto_increment, "{dialect}");
            assert!(!dialect.map_type("int").auto_increment, "{dialect}");
        }
    }

    #[test]
    fn test_enum_rules() {
        let mapping = Dialect::PostgreSql.map_type("enum('draft','live')");
        assert_eq!(mapping.kind, ValueKind::Enum);
        assert_eq!(mapping.validation_rules, vec!["in:draft,live"]);
        assert_eq!(mapping.host_type, "String");
    }
}
