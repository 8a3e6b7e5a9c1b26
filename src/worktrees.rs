use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

use crate::db::now_utc_rfc3339;
use crate::error::{Missing, StoreError};
use crate::store::Store;

/// A tracked worktree.
///
/// `managed` is true when the store created the worktree itself; an adopted
/// worktree existed beforehand and carries `adopted_at`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Worktree {
    pub id: i64,
    pub repo_id: i64,
    pub name: String,
    pub branch: String,
    pub path: String,
    pub base_branch: Option<String>,
    pub managed: bool,
    pub adopted_at: Option<String>,
    pub last_accessed: Option<String>,
    pub created_at: String,
}

/// Partial update of a worktree; only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct WorktreeUpdate {
    pub last_accessed: Option<String>,
    pub adopted_at: Option<String>,
    pub managed: Option<bool>,
    pub base_branch: Option<String>,
}

fn read_worktree(row: &Row<'_>) -> rusqlite::Result<Worktree> {
    Ok(Worktree {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        name: row.get(2)?,
        branch: row.get(3)?,
        path: row.get(4)?,
        base_branch: row.get(5)?,
        managed: row.get::<_, i64>(6)? != 0,
        adopted_at: row.get(7)?,
        last_accessed: row.get(8)?,
        created_at: row.get(9)?,
    })
}

const WORKTREE_COLUMNS: &str =
    "id, repo_id, name, branch, path, base_branch, managed, adopted_at, last_accessed, created_at";

impl Store {
    /// Track a worktree the store itself created.
    pub fn create_worktree(
        &mut self,
        repo_id: i64,
        name: &str,
        branch: &str,
        path: &str,
        base_branch: Option<&str>,
    ) -> Result<Worktree, StoreError> {
        self.insert_worktree(repo_id, name, branch, path, base_branch, true)
    }

    /// Start tracking a pre-existing worktree.
    pub fn adopt_worktree(
        &mut self,
        repo_id: i64,
        name: &str,
        branch: &str,
        path: &str,
        base_branch: Option<&str>,
    ) -> Result<Worktree, StoreError> {
        self.insert_worktree(repo_id, name, branch, path, base_branch, false)
    }

    fn insert_worktree(
        &mut self,
        repo_id: i64,
        name: &str,
        branch: &str,
        path: &str,
        base_branch: Option<&str>,
        managed: bool,
    ) -> Result<Worktree, StoreError> {
        let created_at = now_utc_rfc3339();
        let adopted_at = if managed { None } else { Some(created_at.clone()) };

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

        // Paths are unique across all repos, not per repo.
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM worktrees WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::DuplicatePath(path.to_string()));
        }

        tx.execute(
            "INSERT INTO worktrees (repo_id, name, branch, path, base_branch, managed, adopted_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                repo_id,
                name,
                branch,
                path,
                base_branch,
                managed as i64,
                adopted_at,
                created_at
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(worktree_id = id, repo_id, path, managed, "tracking worktree");
        Ok(Worktree {
            id,
            repo_id,
            name: name.to_string(),
            branch: branch.to_string(),
            path: path.to_string(),
            base_branch: base_branch.map(String::from),
            managed,
            adopted_at,
            last_accessed: None,
            created_at,
        })
    }

    /// Record an access: sets `last_accessed` to now.
    pub fn touch_worktree(&mut self, id: i64) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "UPDATE worktrees SET last_accessed = ?1 WHERE id = ?2",
            params![now_utc_rfc3339(), id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(Missing::Worktree(id)));
        }
        Ok(())
    }

    /// Update selected fields on a worktree. Only `Some` fields are written.
    pub fn update_worktree(&mut self, id: i64, update: &WorktreeUpdate) -> Result<(), StoreError> {
        let mut sets = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref v) = update.last_accessed {
            sets.push("last_accessed = ?");
            values.push(Box::new(v.clone()));
        }
        if let Some(ref v) = update.adopted_at {
            sets.push("adopted_at = ?");
            values.push(Box::new(v.clone()));
        }
        if let Some(v) = update.managed {
            sets.push("managed = ?");
            values.push(Box::new(v as i64));
        }
        if let Some(ref v) = update.base_branch {
            sets.push("base_branch = ?");
            values.push(Box::new(v.clone()));
        }

        if sets.is_empty() {
            return Ok(());
        }

        values.push(Box::new(id));
        let sql = format!("UPDATE worktrees SET {} WHERE id = ?", sets.join(", "));
        let value_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|value| value.as_ref()).collect();
        let affected = self.conn.execute(&sql, value_refs.as_slice())?;

        if affected == 0 {
            return Err(StoreError::NotFound(Missing::Worktree(id)));
        }
        Ok(())
    }

    /// Get a worktree by id.
    pub fn worktree(&self, id: i64) -> Result<Worktree, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {WORKTREE_COLUMNS} FROM worktrees WHERE id = ?1"),
                params![id],
                read_worktree,
            )
            .optional()?
            .ok_or(StoreError::NotFound(Missing::Worktree(id)))
    }

    /// Get a worktree by its filesystem path.
    pub fn worktree_by_path(&self, path: &str) -> Result<Worktree, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {WORKTREE_COLUMNS} FROM worktrees WHERE path = ?1"),
                params![path],
                read_worktree,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(Missing::WorktreePath(path.to_string())))
    }

    /// List all worktrees belonging to a repo.
    pub fn list_worktrees(&self, repo_id: i64) -> Result<Vec<Worktree>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WORKTREE_COLUMNS} FROM worktrees WHERE repo_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![repo_id], read_worktree)?;

        let mut worktrees = Vec::new();
        for row in rows {
            worktrees.push(row?);
        }
        Ok(worktrees)
    }
}
