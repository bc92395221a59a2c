pub mod config;
pub mod docs;
pub mod generator;
pub mod lexer;
pub mod measure;
pub mod model;
pub mod naming;
pub mod order;
pub mod parser;
pub mod sql;
pub mod template;

use std::sync::{Arc, LazyLock};
use wasm_bindgen::prelude::*;

use generator::{parse_timestamp, GenerateOptions, GeneratorRegistry};
use model::{Diagram, FrameworkConfigOverride};
use sql::Dialect;
use template::TemplateRenderer;

/// Shared across calls so compiled templates are reused.
static REGISTRY: LazyLock<GeneratorRegistry> =
    LazyLock::new(|| GeneratorRegistry::with_builtin(Arc::new(TemplateRenderer::default())));

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Export a JSON diagram as DDL. Tables are emitted in the order given.
#[wasm_bindgen(js_name = "exportSql")]
pub fn export_sql(
    diagram_json: &str,
    dialect: &str,
    schema: Option<String>,
) -> Result<String, String> {
    let diagram = Diagram::from_json(diagram_json).map_err(|e| e.to_string())?;
    let dialect =
        Dialect::from_str(dialect).ok_or_else(|| format!("Unknown SQL dialect: {dialect}"))?;
    Ok(sql::export_schema(
        &diagram.tables,
        &diagram.relationships,
        dialect,
        schema.as_deref(),
    ))
}

/// Generate scaffolding; returns a JSON array of `{path, filename, content}`.
#[wasm_bindgen(js_name = "generateScaffold")]
pub fn generate_scaffold(
    diagram_json: &str,
    target: &str,
    config_json: Option<String>,
    timestamp: &str,
) -> Result<String, String> {
    let diagram = Diagram::from_json(diagram_json).map_err(|e| e.to_string())?;
    let overrides: FrameworkConfigOverride = match config_json.as_deref() {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(json).map_err(|e| format!("Invalid config: {e}"))?
        }
        _ => FrameworkConfigOverride::default(),
    };
    let timestamp =
        parse_timestamp(timestamp).map_err(|e| format!("Invalid timestamp {timestamp}: {e}"))?;

    let files = REGISTRY
        .generate(target, &diagram.tables, &overrides, &GenerateOptions::new(timestamp))
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&files).map_err(|e| e.to_string())
}

/// Dependency-ordered table names as a JSON array.
#[wasm_bindgen(js_name = "suggestOrder")]
pub fn suggest_order(diagram_json: &str) -> Result<String, String> {
    let diagram = Diagram::from_json(diagram_json).map_err(|e| e.to_string())?;
    let names = order::order_names(&diagram.tables, &diagram.relationships);
    serde_json::to_string(&names).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAGRAM: &str = r#"{
        "tables": [
            {"name": "posts", "columns": [
                {"name": "id", "type": "int", "isPrimaryKey": true},
                {"name": "user_id", "type": "int", "nullable": false}
            ]},
            {"name": "users", "columns": [
                {"name": "id", "type": "int", "isPrimaryKey": true}
            ]}
        ],
        "relationships": [
            {"fromTable": "posts", "fromColumn": "user_id", "toTable": "users", "toColumn": "id"}
        ]
    }"#;

    #[test]
    fn test_export_sql() {
        let sql = export_sql(DIAGRAM, "postgres", None).unwrap();
        assert!(sql.contains("CREATE TABLE \"posts\""));
        assert!(export_sql(DIAGRAM, "oracle", None).unwrap_err().contains("oracle"));
    }

    #[test]
    fn test_suggest_order() {
        assert_eq!(suggest_order(DIAGRAM).unwrap(), r#"["users","posts"]"#);
    }

    #[test]
    fn test_generate_scaffold() {
        let json = generate_scaffold(
            DIAGRAM,
            "yii3",
            Some(r#"{"namespace": "Blog"}"#.to_string()),
            "20240102030405",
        )
        .unwrap();
        let files: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();

        assert_eq!(files[0]["path"], "migrations");
        assert_eq!(files[0]["filename"], "M2024010203040599CreateUsersTable.php");
        assert!(files.iter().any(|f| f["content"].as_str().unwrap().contains("namespace Blog\\Entity;")));
    }

    #[test]
    fn test_generate_scaffold_errors() {
        assert!(generate_scaffold(DIAGRAM, "rails", None, "20240102030405")
            .unwrap_err()
            .contains("not supported"));
        assert!(generate_scaffold(DIAGRAM, "yii3", None, "yesterday").is_err());
    }
}
