//! Configuration management for Gridkit
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (GRIDKIT_* prefix, highest precedence)
//! 2. gridkit.local.toml (gitignored, local overrides)
//! 3. gridkit.toml (git-tracked, project config)
//! 4. ~/.config/gridkit/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! [`GridkitConfig::from_file`] reads one file instead of the layers above.

use anyhow::Result;
use gridkit_query::Culture;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Gridkit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridkitConfig {
    pub query: QueryConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Offset defining local time for date literals and records (`+HH:MM`).
    pub utc_offset: String,
    /// Page size used when a request leaves `take` at 0. Zero means no limit.
    pub default_take: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            utc_offset: "+00:00".to_string(),
            default_take: 0,
        }
    }
}

impl QueryConfig {
    /// Builds the parsing culture for this offset.
    pub fn culture(&self) -> Result<Culture, ConfigError> {
        Culture::parse_utc_offset(&self.utc_offset)
            .map(|offset| Culture::invariant().with_utc_offset(offset))
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "query.utc_offset must look like +HH:MM, got {:?}",
                    self.utc_offset
                ))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GridkitConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Load a single TOML file, skipping every other source.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.query.culture()?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = GridkitConfig::default();
        assert_eq!(config.query.utc_offset, "+00:00");
        assert_eq!(config.query.default_take, 0);
        assert!(config.output.pretty);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_culture_from_offset() {
        let query = QueryConfig {
            utc_offset: "+08:00".to_string(),
            ..Default::default()
        };
        let culture = query.culture().unwrap();
        assert_eq!(culture.utc_offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_bad_offset_is_validation_error() {
        let mut config = GridkitConfig::default();
        config.query.utc_offset = "Europe/Paris".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("Europe/Paris")
        ));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "[query]\ndefault_take = 25\n").unwrap();

        let config = GridkitConfig::from_file(&path).unwrap();
        assert_eq!(config.query.default_take, 25);
        assert_eq!(config.query.utc_offset, "+00:00");
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(
            GridkitConfig::from_file(&missing),
            Err(ConfigError::ReadError { .. })
        ));

        let broken = temp_dir.path().join("broken.toml");
        std::fs::write(&broken, "[query\n").unwrap();
        assert!(matches!(
            GridkitConfig::from_file(&broken),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = GridkitConfig::default();
        config.output.pretty = false;
        let text = config.to_toml().unwrap();
        assert!(text.contains("[query]"));

        let parsed: GridkitConfig = toml::from_str(&text).unwrap();
        assert!(!parsed.output.pretty);
    }

    #[test]
    fn test_only_query_sections_rendered() {
        let text = GridkitConfig::default().to_toml().unwrap();
        let tables: Vec<_> = text.lines().filter(|l| l.starts_with('[')).collect();
        assert_eq!(tables, ["[query]", "[output]", "[logging]"]);
    }
}
