use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

use crate::db::now_utc_rfc3339;
use crate::error::{Missing, StoreError};
use crate::store::Store;

/// A registered source repository.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Repo {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub default_base: Option<String>,
    pub created_at: String,
}

impl Store {
    /// Register a repo under a unique filesystem path.
    ///
    /// Re-registering an existing path is rejected, not merged; callers that
    /// are unsure should look up by path first.
    pub fn register_repo(
        &mut self,
        name: &str,
        path: &str,
        default_base: Option<&str>,
    ) -> Result<Repo, StoreError> {
        let created_at = now_utc_rfc3339();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM repos WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::DuplicatePath(path.to_string()));
        }

        tx.execute(
            "INSERT INTO repos (name, path, default_base, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, path, default_base, created_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(repo_id = id, path, "registered repo");
        Ok(Repo {
            id,
            name: name.to_string(),
            path: path.to_string(),
            default_base: default_base.map(String::from),
            created_at,
        })
    }

    /// Get a repo by id.
    pub fn repo(&self, id: i64) -> Result<Repo, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, path, default_base, created_at FROM repos WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Repo {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        path: row.get(2)?,
                        default_base: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound(Missing::Repo(id)))
    }

    /// Get a repo by its filesystem path.
    pub fn repo_by_path(&self, path: &str) -> Result<Repo, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, path, default_base, created_at FROM repos WHERE path = ?1",
                params![path],
                |row| {
                    Ok(Repo {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        path: row.get(2)?,
                        default_base: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(Missing::RepoPath(path.to_string())))
    }

    /// List registered repos in registration order.
    pub fn list_repos(&self) -> Result<Vec<Repo>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, path, default_base, created_at FROM repos ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Repo {
                id: row.get(0)?,
                name: row.get(1)?,
                path: row.get(2)?,
                default_base: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        let mut repos = Vec::new();
        for row in rows {
            repos.push(row?);
        }
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Missing, StoreError};
    use crate::store::Store;

    #[test]
    fn register_then_lookup_roundtrips() {
        let mut store = Store::open_in_memory().expect("store should open");

        let repo = store
            .register_repo("app", "/repos/app", Some("main"))
            .expect("registration should succeed");

        assert_eq!(store.repo(repo.id).unwrap(), repo);
        assert_eq!(store.repo_by_path("/repos/app").unwrap(), repo);
        assert_eq!(repo.default_base.as_deref(), Some("main"));
    }

    #[test]
    fn duplicate_path_is_rejected_and_first_repo_survives() {
        let mut store = Store::open_in_memory().expect("store should open");

        let first = store.register_repo("app", "/repos/app", None).unwrap();
        let err = store.register_repo("other", "/repos/app", None).unwrap_err();

        assert!(matches!(err, StoreError::DuplicatePath(path) if path == "/repos/app"));
        assert_eq!(store.repo_by_path("/repos/app").unwrap().id, first.id);
        assert_eq!(store.list_repos().unwrap().len(), 1);
    }

    #[test]
    fn lookup_of_unknown_repo_fails() {
        let store = Store::open_in_memory().expect("store should open");

        let err = store.repo(42).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Missing::Repo(42))));

        let err = store.repo_by_path("/nowhere").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Missing::RepoPath(_))));
    }

    #[test]
    fn list_repos_preserves_registration_order() {
        let mut store = Store::open_in_memory().expect("store should open");

        store.register_repo("a", "/repos/a", None).unwrap();
        store.register_repo("b", "/repos/b", None).unwrap();
        store.register_repo("c", "/repos/c", None).unwrap();

        let names: Vec<String> = store
            .list_repos()
            .unwrap()
            .into_iter()
            .map(|repo| repo.name)
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
