use super::yii::{YiiGenerator, TARGET as YII3};
use super::{GenerateError, GenerateOptions, GeneratorPlugin, ValidationReport};
use crate::model::{FrameworkConfigOverride, GeneratedFile, Table};
use crate::template::TemplateRenderer;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Target name to plugin. Populated at startup, read-only afterwards.
#[derive(Default)]
pub struct GeneratorRegistry {
    plugins: BTreeMap<String, Box<dyn GeneratorPlugin>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in target, sharing one template renderer.
    pub fn with_builtin(renderer: Arc<TemplateRenderer>) -> Self {
        let mut registry = Self::new();
        registry.register(YII3, YiiGenerator::new(renderer));
        registry
    }

    /// Registering an existing name replaces the previous plugin.
    pub fn register(&mut self, name: impl Into<String>, plugin: impl GeneratorPlugin + 'static) {
        let name = name.into();
        if self.plugins.insert(name.clone(), Box::new(plugin)).is_some() {
            warn!(target_name = %name, "replaced generator plugin");
        }
    }

    pub fn list_targets(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn get_plugin(&self, name: &str) -> Option<&dyn GeneratorPlugin> {
        self.plugins.get(name).map(|plugin| plugin.as_ref())
    }

    fn plugin(&self, name: &str) -> Result<&dyn GeneratorPlugin, GenerateError> {
        self.get_plugin(name)
            .ok_or_else(|| GenerateError::UnsupportedTarget(name.to_string()))
    }

    pub fn validate(&self, target: &str, tables: &[Table]) -> Result<ValidationReport, GenerateError> {
        Ok(self.plugin(target)?.validate_diagram(tables))
    }

    /// Merge `overrides` onto the plugin defaults, validate, then delegate.
    /// A pre-ordered list replaces `tables` as the set that gets validated,
    /// since that is what the plugin emits. The plugin's output is returned as is.
    pub fn generate(
        &self,
        target: &str,
        tables: &[Table],
        overrides: &FrameworkConfigOverride,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let plugin = self.plugin(target)?;
        let config = plugin.config().merged(overrides);

        let report = plugin.validate_diagram(options.pre_ordered.as_deref().unwrap_or(tables));
        if !report.is_valid {
            return Err(GenerateError::ValidationFailed(report.errors));
        }

        let files = plugin.generate_files(tables, &config, options)?;
        info!(target_name = target, files = files.len(), "generation finished");
        Ok(files)
    }
}
