use std::error::Error;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Global configuration loaded from `~/.config/trench/config.toml`.
///
/// Every section and field is optional; a missing file yields the defaults.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    pub database: Option<DatabaseConfig>,
    pub git: Option<GitConfig>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Overrides the database file location.
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct GitConfig {
    /// Base branch used when a repo is registered without one.
    pub default_base: Option<String>,
}

impl Config {
    /// Load config from the XDG config directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&crate::paths::config_path()?)
    }

    /// Load config from a specific file path.
    ///
    /// Returns `Config::default()` if the file does not exist; an error only
    /// when the file exists but contains invalid TOML.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::load_from_str(&raw)
    }

    pub fn load_from_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn default_base(&self) -> Option<&str> {
        self.git.as_ref().and_then(|git| git.default_base.as_deref())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    NoHomeDir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "I/O error: {}", err),
            ConfigError::Toml(err) => write!(f, "invalid config TOML: {}", err),
            ConfigError::NoHomeDir => {
                write!(f, "cannot resolve home directory (HOME is not set)")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Toml(err) => Some(err),
            ConfigError::NoHomeDir => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}
