//! `erdgen.toml`: framework overrides and generation defaults.
//!
//! ```toml
//! [framework]
//! namespace = "App\\Blog"
//! schema_name = "blog"
//!
//! [generate]
//! target = "yii3"
//! repository = true
//! tables = ["users", "posts"]
//! ```

use crate::generator::GenerateOptions;
use crate::model::FrameworkConfigOverride;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_FILE: &str = "erdgen.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub framework: FrameworkConfigOverride,
    #[serde(default)]
    pub generate: GenerateDefaults,
}

/// Unset fields leave the option untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateDefaults {
    pub target: Option<String>,
    pub migration: Option<bool>,
    pub model: Option<bool>,
    pub repository: Option<bool>,
    pub tables: Option<Vec<String>>,
    pub order: Option<Vec<String>>,
}

impl GenerateDefaults {
    pub fn apply(&self, options: &mut GenerateOptions) {
        if let Some(v) = self.migration {
            options.generate_migration = v;
        }
        if let Some(v) = self.model {
            options.generate_model = v;
        }
        if let Some(v) = self.repository {
            options.generate_repository = v;
        }
        if let Some(tables) = &self.tables {
            options.selected_tables = tables.clone();
        }
        if let Some(order) = &self.order {
            options.table_order = order.clone();
        }
    }
}

impl FileConfig {
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::load(&dir.path().join(DEFAULT_FILE)).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_full_file() {
        let file = write_config(
            r#"
[framework]
namespace = "App\\Blog"
schema_name = "blog"

[generate]
target = "yii3"
migration = false
repository = true
tables = ["users", "posts"]
order = ["posts"]
"#,
        );
        let config = FileConfig::load(file.path()).unwrap();

        assert_eq!(config.framework.namespace.as_deref(), Some("App\\Blog"));
        assert_eq!(config.framework.version, None);
        assert_eq!(config.generate.target.as_deref(), Some("yii3"));

        let mut options = GenerateOptions::new(NaiveDateTime::default());
        config.generate.apply(&mut options);
        assert!(!options.generate_migration);
        assert!(options.generate_model);
        assert!(options.generate_repository);
        assert_eq!(options.selected_tables, vec!["users", "posts"]);
        assert_eq!(options.table_order, vec!["posts"]);
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config("[framework\nnamespace = ");
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let file = write_config("[framework]\nnamespcae = \"Typo\"\n");
        assert!(matches!(
            FileConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
