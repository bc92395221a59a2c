//! Abstract column type to Yii3 migration builder, PHP type and validator rules.

use crate::sql::{AbstractType, TypeMapper, TypeMapping, ValueKind};

const UUID_PATTERN: &str = "/^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$/i";

/// `storage_type` is the `ColumnBuilder` method, `host_type` the PHP property
/// type, `validation_rules` the `yiisoft/validator` attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct YiiTypeMapper;

impl TypeMapper for YiiTypeMapper {
    fn map_type(&self, abstract_type: &str) -> TypeMapping {
        let t = AbstractType::parse(abstract_type);
        use ValueKind::*;
        let (mapping, php) = match t.base.as_str() {
            "varchar" | "character varying" | "string" | "nvarchar" => {
                (TypeMapping::new("string", Text).with_length_or(&t.args, "255"), "string")
            }
            "char" | "character" | "nchar" => {
                (TypeMapping::new("char", Text).with_length_or(&t.args, "1"), "string")
            }
            "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => {
                (TypeMapping::new("text", Text), "string")
            }

            "tinyint" => (TypeMapping::new("tinyInteger", Integer), "int"),
            "smallint" | "int2" | "year" => (TypeMapping::new("smallInteger", Integer), "int"),
            "mediumint" | "int" | "integer" | "int4" => (TypeMapping::new("integer", Integer), "int"),
            "bigint" | "int8" => (TypeMapping::new("bigInteger", Integer), "int"),
            "smallserial" | "serial" | "increments" => {
                (TypeMapping::new("primaryKey", Integer).auto_increment(), "int")
            }
            "bigserial" | "bigincrements" => {
                (TypeMapping::new("bigPrimaryKey", Integer).auto_increment(), "int")
            }

            // Kept as strings in PHP to avoid losing precision.
            "decimal" | "numeric" => {
                (TypeMapping::new("decimal", Decimal).with_length_or(&t.args, "10, 2"), "string")
            }
            "money" => (TypeMapping::new("money", Decimal).with_length(t.args.clone()), "string"),
            "float" | "real" | "float4" => (TypeMapping::new("float", Float), "float"),
            "double" | "double precision" | "float8" => (TypeMapping::new("double", Float), "float"),

            "boolean" | "bool" | "bit" => (TypeMapping::new("boolean", Boolean), "bool"),

            "date" => (TypeMapping::new("date", Date), "string"),
            "datetime" => (TypeMapping::new("dateTime", DateTime), "string"),
            "timestamp" | "timestamptz" | "timestamp with time zone" => {
                (TypeMapping::new("timestamp", DateTime), "string")
            }
            "time" => (TypeMapping::new("time", Time), "string"),

            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea" => {
                (TypeMapping::new("binary", Binary), "string")
            }

            "json" | "jsonb" => (TypeMapping::new("json", Json), "array"),
            "uuid" | "guid" => (TypeMapping::new("uuid", Uuid), "string"),

            "enum" | "set" => (TypeMapping::new("string", Enum).with_length(Some("255".to_string())), "string"),

            _ => (TypeMapping::new("string", Text), "string"),
        };

        let rules = rules(&mapping, &t);
        mapping.with_host_type(php).with_rules(rules)
    }
}

fn rules(mapping: &TypeMapping, t: &AbstractType) -> Vec<String> {
    match mapping.kind {
        ValueKind::Text => match mapping.length.as_deref().and_then(|l| l.parse::<u32>().ok()) {
            Some(max) => vec![format!("Length(max: {max})")],
            None => vec!["StringValue()".to_string()],
        },
        ValueKind::Integer => vec!["Integer()".to_string()],
        ValueKind::Decimal | ValueKind::Float => vec!["Number()".to_string()],
        ValueKind::Boolean => vec!["BooleanValue()".to_string()],
        ValueKind::Date => vec!["Date()".to_string()],
        ValueKind::DateTime => vec!["DateTime()".to_string()],
        ValueKind::Time => vec!["Time()".to_string()],
        ValueKind::Uuid => vec![format!("Regex(pattern: '{UUID_PATTERN}')")],
        ValueKind::Enum => {
            let members = t.members();
            if members.is_empty() {
                vec!["StringValue()".to_string()]
            } else {
                let quoted: Vec<String> = members.iter().map(|m| php_string(m)).collect();
                vec![format!("In([{}])", quoted.join(", "))]
            }
        }
        ValueKind::Json | ValueKind::Binary => Vec::new(),
    }
}

/// Single-quoted PHP string literal.
pub fn php_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("varchar(100)", "string(100)", "string")]
    #[case("VARCHAR", "string(255)", "string")]
    #[case("char", "char(1)", "string")]
    #[case("int", "integer", "int")]
    #[case("bigserial", "bigPrimaryKey", "int")]
    #[case("decimal(12,4)", "decimal(12,4)", "string")]
    #[case("decimal", "decimal(10, 2)", "string")]
    #[case("double precision", "double", "float")]
    #[case("bool", "boolean", "bool")]
    #[case("datetime", "dateTime", "string")]
    #[case("jsonb", "json", "array")]
    #[case("enum('a','b')", "string(255)", "string")]
    fn test_builder_and_php_type(#[case] input: &str, #[case] builder: &str, #[case] php: &str) {
        let mapping = YiiTypeMapper.map_type(input);
        assert_eq!(mapping.sql_type(), builder);
        assert_eq!(mapping.host_type, php);
    }

    #[test]
    fn test_unknown_type_falls_back_to_string() {
        let mapping = YiiTypeMapper.map_type("geometry");
        assert_eq!(mapping.storage_type, "string");
        assert_eq!(mapping.host_type, "string");
        assert_eq!(mapping.validation_rules, vec!["StringValue()"]);
    }

    #[test]
    fn test_rules() {
        assert_eq!(YiiTypeMapper.map_type("varchar(80)").validation_rules, vec!["Length(max: 80)"]);
        assert_eq!(YiiTypeMapper.map_type("smallint").validation_rules, vec!["Integer()"]);
        assert_eq!(
            YiiTypeMapper.map_type("enum('draft', 'live')").validation_rules,
            vec!["In(['draft', 'live'])"]
        );
        assert!(YiiTypeMapper.map_type("uuid").validation_rules[0].starts_with("Regex(pattern:"));
        assert!(YiiTypeMapper.map_type("blob").validation_rules.is_empty());
    }

    #[test]
    fn test_php_string_escapes() {
        assert_eq!(php_string("O'Reilly"), "'O\\'Reilly'");
        assert_eq!(php_string("a\\b"), "'a\\\\b'");
    }
}
