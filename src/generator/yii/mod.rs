//! Yii3 application scaffolding.

mod context;
mod types;

pub use context::{is_audit_column, AUDIT_COLUMNS};
pub use types::YiiTypeMapper;

use self::context::{DiagramContext, TableContext};
use super::{GenerateError, GenerateOptions, GeneratorPlugin, TIMESTAMP_FORMAT};
use crate::model::{FrameworkConfig, GeneratedFile, Relationship, Table};
use crate::order::{apply_explicit_order, order_tables, relationships_of, sort_by_priority};
use crate::sql::{TypeMapper, TypeMapping};
use crate::template::TemplateRenderer;
use std::collections::BTreeSet;
use std::sync::Arc;
use tera::Context;
use tracing::{debug, info};

pub const TARGET: &str = "yii3";
const EXTENSION: &str = "php";
const DEFAULT_PRIORITY: i32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Migration,
    Model,
    Query,
    ReadAccessors,
    WriteAccessors,
    Rules,
    Relations,
    Service,
    Repository,
    CreateDto,
    UpdateDto,
    Search,
    CreateForm,
    UpdateForm,
    CreateAction,
    UpdateAction,
    DeleteAction,
    Controller,
    Module,
    Access,
    Params,
    Routes,
}

impl Artifact {
    pub const PER_TABLE: [Artifact; 18] = [
        Artifact::Migration,
        Artifact::Model,
        Artifact::Query,
        Artifact::ReadAccessors,
        Artifact::WriteAccessors,
        Artifact::Rules,
        Artifact::Relations,
        Artifact::Service,
        Artifact::Repository,
        Artifact::CreateDto,
        Artifact::UpdateDto,
        Artifact::Search,
        Artifact::CreateForm,
        Artifact::UpdateForm,
        Artifact::CreateAction,
        Artifact::UpdateAction,
        Artifact::DeleteAction,
        Artifact::Controller,
    ];

    pub const PER_DIAGRAM: [Artifact; 4] = [
        Artifact::Module,
        Artifact::Access,
        Artifact::Params,
        Artifact::Routes,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Artifact::Migration => "migration",
            Artifact::Model => "model",
            Artifact::Query => "query",
            Artifact::ReadAccessors => "read_accessors",
            Artifact::WriteAccessors => "write_accessors",
            Artifact::Rules => "rules",
            Artifact::Relations => "relations",
            Artifact::Service => "service",
            Artifact::Repository => "repository",
            Artifact::CreateDto => "create_dto",
            Artifact::UpdateDto => "update_dto",
            Artifact::Search => "search",
            Artifact::CreateForm => "create_form",
            Artifact::UpdateForm => "update_form",
            Artifact::CreateAction => "create_action",
            Artifact::UpdateAction => "update_action",
            Artifact::DeleteAction => "delete_action",
            Artifact::Controller => "controller",
            Artifact::Module => "module",
            Artifact::Access => "access",
            Artifact::Params => "params",
            Artifact::Routes => "routes",
        }
    }

    /// Both DTOs share one template, as do both forms.
    pub fn template(self) -> &'static str {
        match self {
            Artifact::CreateDto | Artifact::UpdateDto => "yii3/dto.php.tera",
            Artifact::CreateForm | Artifact::UpdateForm => "yii3/form.php.tera",
            Artifact::Migration => "yii3/migration.php.tera",
            Artifact::Model => "yii3/model.php.tera",
            Artifact::Query => "yii3/query.php.tera",
            Artifact::ReadAccessors => "yii3/read_accessors.php.tera",
            Artifact::WriteAccessors => "yii3/write_accessors.php.tera",
            Artifact::Rules => "yii3/rules.php.tera",
            Artifact::Relations => "yii3/relations.php.tera",
            Artifact::Service => "yii3/service.php.tera",
            Artifact::Repository => "yii3/repository.php.tera",
            Artifact::Search => "yii3/search.php.tera",
            Artifact::CreateAction => "yii3/create_action.php.tera",
            Artifact::UpdateAction => "yii3/update_action.php.tera",
            Artifact::DeleteAction => "yii3/delete_action.php.tera",
            Artifact::Controller => "yii3/controller.php.tera",
            Artifact::Module => "yii3/module.php.tera",
            Artifact::Access => "yii3/access.php.tera",
            Artifact::Params => "yii3/params.php.tera",
            Artifact::Routes => "yii3/routes.php.tera",
        }
    }

    pub fn is_enabled(self, options: &GenerateOptions) -> bool {
        match self {
            Artifact::Migration => options.generate_migration,
            Artifact::Model
            | Artifact::Query
            | Artifact::ReadAccessors
            | Artifact::WriteAccessors
            | Artifact::Rules
            | Artifact::Relations => options.generate_model,
            Artifact::Repository => options.generate_repository,
            _ => true,
        }
    }

    fn directory(self, entity: &str) -> String {
        match self {
            Artifact::Migration => "migrations".to_string(),
            Artifact::Model => "src/Entity".to_string(),
            Artifact::Query => "src/Entity/Query".to_string(),
            Artifact::ReadAccessors
            | Artifact::WriteAccessors
            | Artifact::Rules
            | Artifact::Relations => "src/Entity/Aspect".to_string(),
            Artifact::Service => "src/Service".to_string(),
            Artifact::Repository => "src/Repository".to_string(),
            Artifact::CreateDto | Artifact::UpdateDto => "src/Dto".to_string(),
            Artifact::Search => "src/Search".to_string(),
            Artifact::CreateForm | Artifact::UpdateForm => "src/Form".to_string(),
            Artifact::CreateAction | Artifact::UpdateAction | Artifact::DeleteAction => {
                format!("src/Action/{entity}")
            }
            Artifact::Controller => "src/Controller".to_string(),
            Artifact::Module => "src".to_string(),
            Artifact::Access | Artifact::Params | Artifact::Routes => "config".to_string(),
        }
    }

    /// PHP class name; `None` for plain config files.
    fn class_name(self, entity: &str) -> Option<String> {
        let suffix = match self {
            Artifact::Model => "",
            Artifact::Query => "Query",
            Artifact::ReadAccessors => "ReadAccessors",
            Artifact::WriteAccessors => "WriteAccessors",
            Artifact::Rules => "Rules",
            Artifact::Relations => "Relations",
            Artifact::Service => "Service",
            Artifact::Repository => "Repository",
            Artifact::CreateDto => "CreateDto",
            Artifact::UpdateDto => "UpdateDto",
            Artifact::Search => "Search",
            Artifact::CreateForm => "CreateForm",
            Artifact::UpdateForm => "UpdateForm",
            Artifact::Controller => "Controller",
            Artifact::CreateAction => return Some("CreateAction".to_string()),
            Artifact::UpdateAction => return Some("UpdateAction".to_string()),
            Artifact::DeleteAction => return Some("DeleteAction".to_string()),
            Artifact::Module => return Some("Module".to_string()),
            Artifact::Migration | Artifact::Access | Artifact::Params | Artifact::Routes => {
                return None;
            }
        };
        Some(format!("{entity}{suffix}"))
    }
}

/// `M` + `YYYYMMDDHHMMSS` + two-digit priority + `Create<Table>Table`.
pub fn migration_class(table: &Table, options: &GenerateOptions) -> String {
    let priority = table.priority.unwrap_or(DEFAULT_PRIORITY).clamp(0, 99);
    format!(
        "M{}{:02}Create{}Table",
        options.timestamp.format(TIMESTAMP_FORMAT),
        priority,
        crate::naming::pascal_case(&table.name)
    )
}

fn namespace(root: &str, directory: &str) -> String {
    match directory.strip_prefix("src") {
        Some(rest) if !rest.is_empty() => {
            format!("{}{}", root, rest.replace('/', "\\"))
        }
        _ => root.to_string(),
    }
}

pub struct YiiGenerator {
    config: FrameworkConfig,
    renderer: Arc<TemplateRenderer>,
}

impl YiiGenerator {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Self {
        Self {
            config: FrameworkConfig {
                target_name: TARGET.to_string(),
                version: "3.0".to_string(),
                namespace: "App".to_string(),
                schema_name: "public".to_string(),
                description: "Yii3 application scaffolding".to_string(),
            },
            renderer,
        }
    }

    /// Selected tables in final emission order.
    fn resolve_tables(&self, tables: &[Table], options: &GenerateOptions) -> Vec<Table> {
        let ordered = match &options.pre_ordered {
            Some(pre) => pre
                .iter()
                .filter(|t| options.is_selected(&t.name))
                .cloned()
                .collect(),
            None => {
                let selected: Vec<Table> = tables
                    .iter()
                    .filter(|t| options.is_selected(&t.name))
                    .cloned()
                    .collect();
                // Links to unselected tables say nothing about the order of the selection.
                let relationships: Vec<Relationship> = relationships_of(&selected)
                    .into_iter()
                    .filter(|r| options.is_selected(&r.to_table))
                    .collect();
                let ordered = order_tables(&selected, &relationships);
                apply_explicit_order(ordered, &options.table_order)
            }
        };
        sort_by_priority(ordered)
    }

    fn render_table_artifact(
        &self,
        artifact: Artifact,
        base: &TableContext,
        options: &GenerateOptions,
    ) -> Result<GeneratedFile, GenerateError> {
        let directory = artifact.directory(&base.entity);
        let class_name = artifact
            .class_name(&base.entity)
            .unwrap_or_else(|| base.migration_class.clone());

        let mut context = Context::from_serialize(base)?;
        context.insert("class_name", &class_name);
        context.insert("namespace", &namespace(&base.config.namespace, &directory));
        context.insert("generate_repository", &options.generate_repository);
        context.insert("generate_model", &options.generate_model);

        let content = self.renderer.render(artifact.template(), &context)?;
        Ok(GeneratedFile::new(
            directory,
            format!("{class_name}.{EXTENSION}"),
            content,
        ))
    }

    fn render_diagram_artifact(
        &self,
        artifact: Artifact,
        base: &DiagramContext,
    ) -> Result<GeneratedFile, GenerateError> {
        let directory = artifact.directory("");
        let mut context = Context::from_serialize(base)?;
        context.insert("namespace", &namespace(&base.config.namespace, &directory));

        let filename = match artifact.class_name("") {
            Some(class_name) => {
                context.insert("class_name", &class_name);
                format!("{class_name}.{EXTENSION}")
            }
            // Config files without a class are named after their key.
            None => format!("{}.{EXTENSION}", artifact.key()),
        };
        let content = self.renderer.render(artifact.template(), &context)?;
        Ok(GeneratedFile::new(directory, filename, content))
    }
}

impl GeneratorPlugin for YiiGenerator {
    fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    fn generate_files(
        &self,
        tables: &[Table],
        config: &FrameworkConfig,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let ordered = self.resolve_tables(tables, options);
        if ordered.is_empty() {
            info!("no tables selected, nothing to generate");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut summaries = Vec::with_capacity(ordered.len());

        for table in &ordered {
            let base = TableContext::build(table, tables, config, migration_class(table, options));
            for artifact in Artifact::PER_TABLE {
                if !artifact.is_enabled(options) {
                    continue;
                }
                debug!(table = %table.name, artifact = artifact.key(), "rendering");
                files.push(self.render_table_artifact(artifact, &base, options)?);
            }
            summaries.push(base.summary());
        }

        let diagram = DiagramContext {
            config: config.clone(),
            tables: summaries,
        };
        for artifact in Artifact::PER_DIAGRAM {
            files.push(self.render_diagram_artifact(artifact, &diagram)?);
        }

        info!(tables = ordered.len(), files = files.len(), "generated yii3 scaffolding");
        Ok(files)
    }

    fn supported_files(&self) -> BTreeSet<&'static str> {
        Artifact::PER_TABLE
            .iter()
            .chain(Artifact::PER_DIAGRAM.iter())
            .map(|a| a.key())
            .collect()
    }

    fn transform_column_type(&self, abstract_type: &str) -> TypeMapping {
        YiiTypeMapper.map_type(abstract_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Diagram, Relationship};
    use chrono::NaiveDate;

    fn options() -> GenerateOptions {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        GenerateOptions::new(ts)
    }

    fn generator() -> YiiGenerator {
        YiiGenerator::new(Arc::new(TemplateRenderer::default()))
    }

    fn blog() -> Diagram {
        Diagram::new(
            vec![
                Table::new(
                    "posts",
                    vec![
                        Column::primary("id", "int"),
                        Column::new("user_id", "int").not_null(),
                        Column::new("title", "varchar(200)").not_null(),
                    ],
                ),
                Table::new(
                    "users",
                    vec![Column::primary("id", "int"), Column::new("email", "varchar(255)").not_null()],
                )
                .with_priority(1),
            ],
            vec![Relationship::new("posts", "user_id", "users", "id")],
        )
    }

    #[test]
    fn test_migration_class_name() {
        let opts = options();
        assert_eq!(
            migration_class(&Table::new("users", vec![]).with_priority(1), &opts),
            "M2024010203040501CreateUsersTable"
        );
        assert_eq!(
            migration_class(&Table::new("order_items", vec![]), &opts),
            "M2024010203040599CreateOrderItemsTable"
        );
        assert_eq!(
            migration_class(&Table::new("x", vec![]).with_priority(250), &opts),
            "M2024010203040599CreateXTable"
        );
    }

    #[test]
    fn test_namespace() {
        assert_eq!(namespace("App", "src/Entity/Aspect"), "App\\Entity\\Aspect");
        assert_eq!(namespace("App", "src"), "App");
        assert_eq!(namespace("App", "config"), "App");
    }

    #[test]
    fn test_supported_files() {
        let files = generator().supported_files();
        assert_eq!(files.len(), 22);
        assert!(files.contains("migration"));
        assert!(files.contains("routes"));
    }

    #[test]
    fn test_default_toggles() {
        let diagram = blog();
        let files = generator()
            .generate_files(&diagram.tables, generator().config(), &options())
            .unwrap();

        // 17 per table without the repository, 4 shared.
        assert_eq!(files.len(), 2 * 17 + 4);
        assert!(!files.iter().any(|f| f.path == "src/Repository"));
        assert_eq!(files[0].full_path(), "migrations/M2024010203040501CreateUsersTable.php");
        assert_eq!(files.last().unwrap().full_path(), "config/routes.php");
    }

    #[test]
    fn test_diagram_artifact_paths() {
        let diagram = blog();
        let files = generator()
            .generate_files(&diagram.tables, generator().config(), &options())
            .unwrap();
        let shared: Vec<String> = files[files.len() - 4..].iter().map(|f| f.full_path()).collect();

        assert_eq!(
            shared,
            ["src/Module.php", "config/access.php", "config/params.php", "config/routes.php"]
        );
    }

    #[test]
    fn test_selection_ignores_links_to_unselected_tables() {
        let diagram = blog();
        let mut opts = options();
        opts.selected_tables = vec!["posts".to_string()];
        let files = generator()
            .generate_files(&diagram.tables, generator().config(), &opts)
            .unwrap();

        assert_eq!(files.len(), 17 + 4);
        assert_eq!(files[0].full_path(), "migrations/M2024010203040599CreatePostsTable.php");
        let relations = files
            .iter()
            .find(|f| f.filename == "PostsRelations.php")
            .unwrap();
        assert!(relations.content.contains("getUserQuery"));
    }

    #[test]
    fn test_toggles_off() {
        let diagram = blog();
        let mut opts = options();
        opts.generate_migration = false;
        opts.generate_model = false;
        opts.generate_repository = true;
        let files = generator()
            .generate_files(&diagram.tables, generator().config(), &opts)
            .unwrap();

        assert_eq!(files.len(), 2 * 11 + 4);
        assert!(!files.iter().any(|f| f.path == "migrations" || f.path.starts_with("src/Entity")));
        assert!(files.iter().any(|f| f.full_path() == "src/Repository/PostsRepository.php"));
    }

    #[test]
    fn test_empty_selection_is_empty_output() {
        let diagram = blog();
        let mut opts = options();
        opts.selected_tables = vec!["missing".to_string()];
        let files = generator()
            .generate_files(&diagram.tables, generator().config(), &opts)
            .unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_pre_ordered_skips_dependency_order() {
        let diagram = blog();
        let mut opts = options();
        let mut users = diagram.tables[1].clone();
        users.priority = None;
        opts.pre_ordered = Some(vec![diagram.tables[0].clone(), users]);
        let files = generator()
            .generate_files(&diagram.tables, generator().config(), &opts)
            .unwrap();

        assert_eq!(files[0].filename, "M2024010203040599CreatePostsTable.php");
    }

    #[test]
    fn test_transform_column_type() {
        assert_eq!(generator().transform_column_type("varchar(64)").sql_type(), "string(64)");
    }
}
