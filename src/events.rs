use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::now_utc_rfc3339;
use crate::error::{Missing, StoreError};
use crate::store::Store;

/// An immutable lifecycle record, scoped to a repo and optionally to one of
/// that repo's worktrees.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Event {
    pub id: i64,
    pub worktree_id: Option<i64>,
    pub repo_id: i64,
    pub event_type: String,
    /// Opaque caller-interpreted payload, stored and returned verbatim.
    pub payload: Option<Value>,
    pub created_at: String,
}

impl Store {
    /// Append an event.
    ///
    /// When a worktree id is given, the worktree must belong to the given
    /// repo; the check and the insert happen in one transaction, so a
    /// mismatched event never becomes visible, even transiently.
    pub fn record_event(
        &mut self,
        repo_id: i64,
        worktree_id: Option<i64>,
        event_type: &str,
        payload: Option<&Value>,
    ) -> Result<Event, StoreError> {
        let created_at = now_utc_rfc3339();
        let payload_text = payload.map(Value::to_string);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let repo_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM repos WHERE id = ?1",
                params![repo_id],
                |row| row.get(0),
            )
            .optional()?;
        if repo_exists.is_none() {
            return Err(StoreError::NotFound(Missing::Repo(repo_id)));
        }

        if let Some(wt_id) = worktree_id {
            let owner_repo_id: Option<i64> = tx
                .query_row(
                    "SELECT repo_id FROM worktrees WHERE id = ?1",
                    params![wt_id],
                    |row| row.get(0),
                )
                .optional()?;
            match owner_repo_id {
                None => return Err(StoreError::NotFound(Missing::Worktree(wt_id))),
                Some(owner_repo_id) if owner_repo_id != repo_id => {
                    warn!(
                        repo_id,
                        worktree_id = wt_id,
                        owner_repo_id,
                        "rejected event scoped to a foreign worktree"
                    );
                    return Err(StoreError::InvariantViolation {
                        repo_id,
                        worktree_id: wt_id,
                        owner_repo_id,
                    });
                }
                Some(_) => {}
            }
        }

        tx.execute(
            "INSERT INTO events (worktree_id, repo_id, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![worktree_id, repo_id, event_type, payload_text, created_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(event_id = id, repo_id, event_type, "recorded event");
        Ok(Event {
            id,
            worktree_id,
            repo_id,
            event_type: event_type.to_string(),
            payload: payload.cloned(),
            created_at,
        })
    }

    /// List a repo's events in creation order, optionally narrowed to one
    /// worktree.
    pub fn list_events(
        &self,
        repo_id: i64,
        worktree_id: Option<i64>,
    ) -> Result<Vec<Event>, StoreError> {
        let (sql, values): (&str, Vec<Box<dyn rusqlite::types::ToSql>>) = match worktree_id {
            Some(wt_id) => (
                "SELECT id, worktree_id, repo_id, event_type, payload, created_at
                 FROM events WHERE repo_id = ?1 AND worktree_id = ?2 ORDER BY id",
                vec![Box::new(repo_id), Box::new(wt_id)],
            ),
            None => (
                "SELECT id, worktree_id, repo_id, event_type, payload, created_at
                 FROM events WHERE repo_id = ?1 ORDER BY id",
                vec![Box::new(repo_id)],
            ),
        };
        let value_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|value| value.as_ref()).collect();

        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(value_refs.as_slice(), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, worktree_id, repo_id, event_type, payload_text, created_at) = row?;
            let payload = payload_text
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;
            events.push(Event {
                id,
                worktree_id,
                repo_id,
                event_type,
                payload,
                created_at,
            });
        }
        Ok(events)
    }

    /// Count events for a worktree, optionally filtered by event type.
    pub fn count_events(
        &self,
        worktree_id: i64,
        event_type: Option<&str>,
    ) -> Result<i64, StoreError> {
        let count: i64 = match event_type {
            Some(event_type) => self.conn.query_row(
                "SELECT COUNT(*) FROM events WHERE worktree_id = ?1 AND event_type = ?2",
                params![worktree_id, event_type],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM events WHERE worktree_id = ?1",
                params![worktree_id],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }
}
