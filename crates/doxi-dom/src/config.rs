//! Document Configuration

use std::path::PathBuf;

use serde::Deserialize;

use crate::ConfigError;

/// Document configuration options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Base directory file paths are stored relative to. Defaults to the
    /// working directory.
    pub base_dir: Option<PathBuf>,

    /// Emit the `src` record when serializing
    pub emit_sources: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: None,
            emit_sources: true,
        }
    }
}

impl Config {
    /// Parse a JSON configuration; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        tracing::debug!(?config, "loaded document config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.emit_sources);
        assert_eq!(config.base_dir, None);
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(r#"{ "baseDir": "/work/docs" }"#).unwrap();
        assert_eq!(config.base_dir, Some(PathBuf::from("/work/docs")));
        assert!(config.emit_sources);

        let config = Config::from_json(r#"{ "emitSources": false }"#).unwrap();
        assert!(!config.emit_sources);

        assert!(matches!(Config::from_json("[1]"), Err(ConfigError::Json(_))));
    }
}
