use std::path::Path;

use rusqlite::Connection;

use crate::config::Config;
use crate::db;
use crate::error::StoreError;
use crate::paths;

/// Handle to the state database.
///
/// All collaborator-facing operations live on this type; the per-entity
/// modules contribute their own `impl Store` blocks.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open (or create) the store at the given database file path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        ensure_parent_dir(path)?;
        let conn = db::open_connection(path)?;
        Ok(Self { conn })
    }

    /// Open the store at its configured location, falling back to the
    /// default data directory when the config carries no override.
    pub fn open_default(config: &Config) -> Result<Self, StoreError> {
        let path = paths::db_path(config)?;
        Self::open(&path)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = db::open_in_memory()?;
        Ok(Self { conn })
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
