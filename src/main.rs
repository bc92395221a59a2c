use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use erdgen::config::{FileConfig, DEFAULT_FILE};
use erdgen::docs::render_markdown;
use erdgen::generator::{parse_timestamp, GenerateOptions, GeneratorRegistry};
use erdgen::model::Diagram;
use erdgen::order::order_tables;
use erdgen::parser::parse_diagram;
use erdgen::sql::{export_schema, Dialect};
use erdgen::template::{DirectoryTemplates, TemplateRenderer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "erdgen", version, about = "ER diagram to SQL and application scaffolding")]
struct Cli {
    /// Log level (error,warn,info,debug,trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export DDL for one SQL dialect
    Sql {
        /// Diagram in `.erd` notation or JSON
        input: PathBuf,
        /// postgres, mysql, sqlite or sqlserver
        #[arg(short, long, default_value = "postgres")]
        dialect: String,
        #[arg(short, long)]
        schema: Option<String>,
        /// Put referenced tables before the tables that reference them
        #[arg(long, action = ArgAction::SetTrue)]
        ordered: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate application scaffolding
    Scaffold {
        input: PathBuf,
        /// Target framework; defaults to the config file value, then yii3
        #[arg(short, long)]
        target: Option<String>,
        #[arg(short, long, default_value = DEFAULT_FILE)]
        config: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Directory whose templates override the built-in ones
        #[arg(long)]
        templates: Option<PathBuf>,
        /// YYYYMMDDHHMMSS; defaults to the current local time
        #[arg(long)]
        timestamp: Option<String>,
        /// Only generate these tables
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
        /// Explicit order for the named tables
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,
        #[arg(long, action = ArgAction::SetTrue)]
        no_migration: bool,
        #[arg(long, action = ArgAction::SetTrue)]
        no_model: bool,
        #[arg(long, action = ArgAction::SetTrue)]
        repository: bool,
        /// List the files without writing them
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Markdown data dictionary
    Docs {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print tables in dependency order
    Order { input: PathBuf },
    /// Check a diagram against a target's rules
    Validate {
        input: PathBuf,
        #[arg(short, long, default_value = "yii3")]
        target: String,
    },
    /// List generator targets
    Targets,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Sql {
            input,
            dialect,
            schema,
            ordered,
            output,
        } => {
            let diagram = load_diagram(&input)?;
            let dialect = Dialect::from_str(&dialect)
                .with_context(|| format!("unknown SQL dialect: {dialect}"))?;
            let tables = if ordered {
                order_tables(&diagram.tables, &diagram.relationships)
            } else {
                diagram.tables.clone()
            };
            let sql = export_schema(&tables, &diagram.relationships, dialect, schema.as_deref());
            write_output(output.as_deref(), &sql)
        }
        Command::Scaffold {
            input,
            target,
            config,
            out_dir,
            templates,
            timestamp,
            tables,
            order,
            no_migration,
            no_model,
            repository,
            dry_run,
        } => {
            let diagram = load_diagram(&input)?;
            let file_config = FileConfig::load(&config)?;

            let timestamp = match timestamp {
                Some(ts) => parse_timestamp(&ts)
                    .with_context(|| format!("invalid timestamp {ts}, expected YYYYMMDDHHMMSS"))?,
                None => chrono::Local::now().naive_local(),
            };
            let mut options = GenerateOptions::new(timestamp);
            file_config.generate.apply(&mut options);
            if no_migration {
                options.generate_migration = false;
            }
            if no_model {
                options.generate_model = false;
            }
            if repository {
                options.generate_repository = true;
            }
            if !tables.is_empty() {
                options.selected_tables = tables;
            }
            if !order.is_empty() {
                options.table_order = order;
            }

            let target = target
                .or(file_config.generate.target.clone())
                .unwrap_or_else(|| "yii3".to_string());
            let files = registry(templates).generate(
                &target,
                &diagram.tables,
                &file_config.framework,
                &options,
            )?;

            for file in &files {
                let path = out_dir.join(file.full_path());
                if !dry_run {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)
                            .with_context(|| format!("create directory {}", parent.display()))?;
                    }
                    fs::write(&path, &file.content)
                        .with_context(|| format!("write {}", path.display()))?;
                }
                println!("{}", path.display());
            }
            info!(files = files.len(), out_dir = %out_dir.display(), "scaffold written");
            Ok(())
        }
        Command::Docs { input, output } => {
            let diagram = load_diagram(&input)?;
            write_output(output.as_deref(), &render_markdown(&diagram))
        }
        Command::Order { input } => {
            let diagram = load_diagram(&input)?;
            for table in order_tables(&diagram.tables, &diagram.relationships) {
                println!("{}", table.name);
            }
            Ok(())
        }
        Command::Validate { input, target } => {
            let diagram = load_diagram(&input)?;
            let report = registry(None).validate(&target, &diagram.tables)?;
            if !report.is_valid {
                for error in &report.errors {
                    eprintln!("{error}");
                }
                bail!("{} validation error(s)", report.errors.len());
            }
            println!("{} tables OK", diagram.tables.len());
            Ok(())
        }
        Command::Targets => {
            for target in registry(None).list_targets() {
                println!("{target}");
            }
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
    debug!("logging initialized");
}

fn registry(templates: Option<PathBuf>) -> GeneratorRegistry {
    let renderer = match templates {
        Some(dir) => TemplateRenderer::new(DirectoryTemplates::new(dir)),
        None => TemplateRenderer::default(),
    };
    GeneratorRegistry::with_builtin(Arc::new(renderer))
}

/// `.json` files hold the JSON diagram form; anything else is `.erd` notation.
fn load_diagram(path: &Path) -> Result<Diagram> {
    let input =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let diagram = if is_json {
        Diagram::from_json(&input).with_context(|| format!("parse JSON diagram {}", path.display()))?
    } else {
        parse_diagram(&input).with_context(|| format!("parse {}", path.display()))?
    };
    debug!(tables = diagram.tables.len(), "diagram loaded");
    Ok(diagram)
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
            eprintln!("Written to {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}
