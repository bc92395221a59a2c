//! Template rendering with a compile-once cache.
//!
//! Templates are looked up by name in a [`TemplateSource`], compiled on first
//! use and kept until [`TemplateRenderer::invalidate_cache`]. Besides Tera's
//! built-ins, templates get these helpers:
//!
//! - filters: `pascal_case`, `camel_case`, `kebab_case`, `snake_case`,
//!   `ucfirst`, `pluralize`, `singularize`, `label`
//! - tests: `eq(other)` for equality, `substring(needle)` for containment
//!
//! Negated conditionals use Tera's `{% if not cond %}`.

use crate::naming;
use rust_embed::RustEmbed;
use std::collections::HashMap;
use std::error::Error as _;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use tera::{Context, Tera, Value};
use tracing::debug;

#[derive(RustEmbed)]
#[folder = "templates/"]
struct Assets;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),
    #[error("Failed to compile template {name}: {message}")]
    Compile { name: String, message: String },
    #[error("Failed to render template {name}: {message}")]
    Render { name: String, message: String },
    #[error("Template cache lock poisoned")]
    Poisoned,
}

/// Where template sources come from.
pub trait TemplateSource: Send + Sync {
    fn load(&self, name: &str) -> Option<String>;
}

/// Templates compiled into the binary from `templates/`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedTemplates;

impl TemplateSource for EmbeddedTemplates {
    fn load(&self, name: &str) -> Option<String> {
        Assets::get(name).and_then(|file| String::from_utf8(file.data.into_owned()).ok())
    }
}

/// Files under `root` override the embedded template of the same name.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    root: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirectoryTemplates {
    fn load(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        match fs::read_to_string(&path) {
            Ok(content) => {
                debug!(template = name, path = %path.display(), "using template override");
                Some(content)
            }
            Err(_) => EmbeddedTemplates.load(name),
        }
    }
}

/// In-memory templates.
#[derive(Debug, Default, Clone)]
pub struct InlineTemplates {
    templates: HashMap<String, String>,
}

impl InlineTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }
}

impl TemplateSource for InlineTemplates {
    fn load(&self, name: &str) -> Option<String> {
        self.templates.get(name).cloned()
    }
}

pub struct TemplateRenderer {
    source: Box<dyn TemplateSource>,
    cache: RwLock<Tera>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(EmbeddedTemplates)
    }
}

impl TemplateRenderer {
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(new_engine()),
        }
    }

    /// Render `name` with `context`, compiling it first if this is its first use.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        self.ensure_compiled(name)?;
        let tera = self.cache.read().map_err(|_| TemplateError::Poisoned)?;
        tera.render(name, context).map_err(|e| TemplateError::Render {
            name: name.to_string(),
            message: error_chain(&e),
        })
    }

    pub fn is_compiled(&self, name: &str) -> bool {
        self.cache
            .read()
            .map(|tera| tera.get_template_names().any(|n| n == name))
            .unwrap_or(false)
    }

    /// Drop every compiled template; the next render recompiles from the source.
    pub fn invalidate_cache(&self) {
        match self.cache.write() {
            Ok(mut tera) => *tera = new_engine(),
            Err(poisoned) => *poisoned.into_inner() = new_engine(),
        }
        self.cache.clear_poison();
    }

    fn ensure_compiled(&self, name: &str) -> Result<(), TemplateError> {
        if self.is_compiled(name) {
            return Ok(());
        }

        let source = self
            .source
            .load(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;

        let mut tera = self.cache.write().map_err(|_| TemplateError::Poisoned)?;
        // Another caller may have compiled it while we waited for the lock.
        if tera.get_template_names().any(|n| n == name) {
            return Ok(());
        }
        debug!(template = name, "compiling template");
        tera.add_raw_template(name, &source)
            .map_err(|e| TemplateError::Compile {
                name: name.to_string(),
                message: error_chain(&e),
            })
    }
}

fn error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn new_engine() -> Tera {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.register_filter("pascal_case", string_filter(naming::pascal_case));
    tera.register_filter("camel_case", string_filter(naming::camel_case));
    tera.register_filter("kebab_case", string_filter(naming::kebab_case));
    tera.register_filter("snake_case", string_filter(naming::snake_case));
    tera.register_filter("ucfirst", string_filter(naming::ucfirst));
    tera.register_filter("pluralize", string_filter(naming::pluralize));
    tera.register_filter("singularize", string_filter(naming::singularize));
    tera.register_filter("label", string_filter(naming::label));
    tera.register_tester("eq", eq_test);
    tera.register_tester("substring", substring_test);
    tera
}

fn string_filter(
    convert: fn(&str) -> String,
) -> impl Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync {
    move |value: &Value, _: &HashMap<String, Value>| match value {
        Value::String(s) => Ok(Value::String(convert(s))),
        Value::Number(n) => Ok(Value::String(convert(&n.to_string()))),
        Value::Bool(b) => Ok(Value::String(convert(&b.to_string()))),
        other => Err(tera::Error::msg(format!(
            "expected a string, got {other}"
        ))),
    }
}

fn eq_test(value: Option<&Value>, args: &[Value]) -> tera::Result<bool> {
    match (value, args.first()) {
        (Some(value), Some(other)) => Ok(value == other),
        (None, Some(Value::Null)) => Ok(true),
        (_, None) => Err(tera::Error::msg("eq test needs one argument")),
        _ => Ok(false),
    }
}

fn substring_test(value: Option<&Value>, args: &[Value]) -> tera::Result<bool> {
    let needle = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("substring test needs one string argument"))?;
    Ok(value
        .and_then(Value::as_str)
        .is_some_and(|haystack| haystack.contains(needle)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn renderer(name: &str, source: &str) -> TemplateRenderer {
        TemplateRenderer::new(InlineTemplates::new().with(name, source))
    }

    #[test]
    fn test_render_with_helpers() {
        let r = renderer(
            "t",
            "{{ name | pascal_case }} {{ name | camel_case }} {{ name | kebab_case }} \
             {{ name | pluralize }} {{ name | label }} {{ word | ucfirst }}",
        );
        let mut ctx = Context::new();
        ctx.insert("name", "order_category");
        ctx.insert("word", "hello");

        assert_eq!(
            r.render("t", &ctx).unwrap(),
            "OrderCategory orderCategory order-category order_categories Order Category Hello"
        );
    }

    #[test]
    fn test_testers_and_negation() {
        let r = renderer(
            "t",
            "{% if kind is eq(\"pk\") %}key{% endif %}|\
             {% if typ is substring(\"char\") %}text{% endif %}|\
             {% if not nullable %}required{% endif %}",
        );
        let mut ctx = Context::new();
        ctx.insert("kind", "pk");
        ctx.insert("typ", "varchar");
        ctx.insert("nullable", &false);

        assert_eq!(r.render("t", &ctx).unwrap(), "key|text|required");
    }

    #[test]
    fn test_compile_once_and_invalidate() {
        let r = renderer("t", "hi");
        assert!(!r.is_compiled("t"));
        r.render("t", &Context::new()).unwrap();
        assert!(r.is_compiled("t"));
        r.invalidate_cache();
        assert!(!r.is_compiled("t"));
        assert_eq!(r.render("t", &Context::new()).unwrap(), "hi");
    }

    #[test]
    fn test_missing_template() {
        let r = renderer("t", "hi");
        let err = r.render("nope", &Context::new()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(ref n) if n == "nope"));
    }

    #[test]
    fn test_compile_and_render_errors() {
        let r = renderer("broken", "{% if %}");
        assert!(matches!(
            r.render("broken", &Context::new()),
            Err(TemplateError::Compile { .. })
        ));

        let r = renderer("t", "{{ missing.field }}");
        assert!(matches!(
            r.render("t", &Context::new()),
            Err(TemplateError::Render { .. })
        ));
    }

    #[test]
    fn test_shared_across_threads() {
        let r = renderer("t", "{{ n }}");
        thread::scope(|s| {
            for i in 0..4 {
                let r = &r;
                s.spawn(move || {
                    let mut ctx = Context::new();
                    ctx.insert("n", &i);
                    assert_eq!(r.render("t", &ctx).unwrap(), i.to_string());
                });
            }
        });
        assert!(r.is_compiled("t"));
    }

    #[test]
    fn test_directory_overrides_embedded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("yii3")).unwrap();
        fs::write(dir.path().join("yii3/params.php.tera"), "override").unwrap();

        let source = DirectoryTemplates::new(dir.path());
        assert_eq!(source.load("yii3/params.php.tera").as_deref(), Some("override"));
        assert!(source.load("yii3/routes.php.tera").is_some());
        assert!(source.load("yii3/missing.tera").is_none());
    }
}
