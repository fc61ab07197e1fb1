//! Configuration file support
//!
//! Settings come from `--config <path>`, else `./faultscope.toml` when it
//! exists, else built-in defaults. Command-line flags override them.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use faultscope_source::{RemoteOptions, SourceOptions};

/// Looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "faultscope.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    pub remote: RemoteConfig,
}

/// `[source]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub encoding: String,
    pub log_suffix: String,
    pub parallel: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let options = SourceOptions::default();
        Self {
            encoding: options.encoding,
            log_suffix: options.log_suffix,
            parallel: options.parallel,
        }
    }
}

impl SourceConfig {
    pub fn to_options(&self) -> SourceOptions {
        SourceOptions {
            encoding: self.encoding.clone(),
            log_suffix: self.log_suffix.clone(),
            parallel: self.parallel,
        }
    }
}

/// `[remote]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub index_pattern: String,
    pub username: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        let options = RemoteOptions::default();
        Self {
            host: options.host,
            port: options.port,
            index_pattern: options.index_pattern,
            username: options.username,
        }
    }
}

impl RemoteConfig {
    pub fn to_options(&self) -> RemoteOptions {
        RemoteOptions {
            host: self.host.clone(),
            port: self.port,
            index_pattern: self.index_pattern.clone(),
            username: self.username.clone(),
        }
    }
}

impl Config {
    /// Load from an explicit path, the default file, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.source.encoding, "utf-8");
        assert_eq!(config.source.log_suffix, ".log");
        assert!(config.source.parallel);
        assert_eq!(config.remote.port, 9200);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
            [source]
            encoding = "euc-kr"

            [remote]
            host = "search.internal"
            username = "ops"
            "#,
        )
        .unwrap();

        assert_eq!(config.source.encoding, "euc-kr");
        assert_eq!(config.source.log_suffix, ".log");
        assert_eq!(config.remote.host, "search.internal");
        assert_eq!(config.remote.port, 9200);
        assert_eq!(config.remote.to_options().username.as_deref(), Some("ops"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_toml("[source]\nencodng = \"utf-8\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faultscope.toml");
        std::fs::write(&path, "[source]\nparallel = false\nlog_suffix = \".txt\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let options = config.source.to_options();
        assert!(!options.parallel);
        assert_eq!(options.log_suffix, ".txt");

        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
