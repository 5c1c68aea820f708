use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::pr::DEFAULT_API_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Optional settings loaded from the file passed with `--config`.
/// Every field has a default, so the tool works with no file at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL, e.g. `https://github.example.com/api/v3` for Enterprise.
    pub api_url: Option<String>,

    /// Read every page of review comments instead of only the first.
    #[serde(default)]
    pub paginate_comments: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// Backslash-escape tabs, newlines and backslashes in field values.
    #[serde(default)]
    pub escape: bool,
}

impl Config {
    /// Load configuration from `path` when one was given.
    /// Without a path no file is read and the defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn api_url(&self) -> &str {
        self.github.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}
