use std::env;
use std::path::PathBuf;

use crate::config::{Config, ConfigError};

/// Data directory holding the database file.
///
/// `$XDG_DATA_HOME/trench`, falling back to `~/.local/share/trench`.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join("trench"));
    }
    match env::var_os("HOME").filter(|v| !v.is_empty()) {
        Some(home) => Ok(PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("trench")),
        None => Err(ConfigError::NoHomeDir),
    }
}

/// Location of the global config file.
///
/// `$XDG_CONFIG_HOME/trench/config.toml`, falling back to
/// `~/.config/trench/config.toml`.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join("trench").join("config.toml"));
    }
    match env::var_os("HOME").filter(|v| !v.is_empty()) {
        Some(home) => Ok(PathBuf::from(home)
            .join(".config")
            .join("trench")
            .join("config.toml")),
        None => Err(ConfigError::NoHomeDir),
    }
}

/// Database file path: the config override when present, otherwise
/// `trench.db` inside the data directory.
pub fn db_path(config: &Config) -> Result<PathBuf, ConfigError> {
    if let Some(path) = config
        .database
        .as_ref()
        .and_then(|database| database.path.as_deref())
    {
        return Ok(PathBuf::from(path));
    }
    Ok(data_dir()?.join("trench.db"))
}
