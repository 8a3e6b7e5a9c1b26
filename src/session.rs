use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::db::now_utc_rfc3339;
use crate::error::{Missing, StoreError};
use crate::store::Store;

impl Store {
    /// Upsert a session entry: the value and `updated_at` are replaced
    /// wholesale, never merged.
    pub fn set_session(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
INSERT INTO session (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
    value = excluded.value,
    updated_at = excluded.updated_at
"#,
            params![key, value, now_utc_rfc3339()],
        )?;
        debug!(key, "set session entry");
        Ok(())
    }

    /// Current value for a session key.
    pub fn get_session(&self, key: &str) -> Result<String, StoreError> {
        self.conn
            .query_row(
                "SELECT value FROM session WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(Missing::SessionKey(key.to_string())))
    }

}
