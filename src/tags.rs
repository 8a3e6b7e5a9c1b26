use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

use crate::db::now_utc_rfc3339;
use crate::error::{Missing, StoreError};
use crate::store::Store;

/// A caller-defined label on a worktree.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub worktree_id: i64,
    pub name: String,
    pub created_at: String,
}

impl Store {
    /// Attach a tag to a worktree.
    ///
    /// A duplicate `(worktree, name)` pair is a hard error; whether to treat
    /// re-tagging as harmless is the caller's call, not the store's.
    pub fn add_tag(&mut self, worktree_id: i64, name: &str) -> Result<Tag, StoreError> {
        let created_at = now_utc_rfc3339();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let worktree_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM worktrees WHERE id = ?1",
                params![worktree_id],
                |row| row.get(0),
            )
            .optional()?;
        if worktree_exists.is_none() {
            return Err(StoreError::NotFound(Missing::Worktree(worktree_id)));
        }

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM tags WHERE worktree_id = ?1 AND name = ?2",
                params![worktree_id, name],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::DuplicateTag {
                worktree_id,
                name: name.to_string(),
            });
        }

        tx.execute(
            "INSERT INTO tags (worktree_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![worktree_id, name, created_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(worktree_id, name, "tagged worktree");
        Ok(Tag {
            id,
            worktree_id,
            name: name.to_string(),
            created_at,
        })
    }

    /// Detach a tag. Returns whether a tag was actually removed.
    pub fn remove_tag(&mut self, worktree_id: i64, name: &str) -> Result<bool, StoreError> {
        let affected = self.conn.execute(
            "DELETE FROM tags WHERE worktree_id = ?1 AND name = ?2",
            params![worktree_id, name],
        )?;
        Ok(affected > 0)
    }

    /// Tag names on a worktree, sorted.
    pub fn list_tags(&self, worktree_id: i64) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM tags WHERE worktree_id = ?1 ORDER BY name")?;
        let rows = stmt.query_map(params![worktree_id], |row| row.get(0))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Missing, StoreError};
    use crate::store::Store;

    fn store_with_worktree() -> (Store, i64) {
        let mut store = Store::open_in_memory().expect("store should open");
        let repo = store.register_repo("app", "/repos/app", None).unwrap();
        let wt = store
            .create_worktree(repo.id, "feature", "feature", "/repos/app/.wt/feature", None)
            .unwrap();
        (store, wt.id)
    }

    #[test]
    fn add_and_list_tags() {
        let (mut store, wt_id) = store_with_worktree();

        store.add_tag(wt_id, "wip").unwrap();
        store.add_tag(wt_id, "review").unwrap();

        assert_eq!(store.list_tags(wt_id).unwrap(), ["review", "wip"]);
    }

    #[test]
    fn duplicate_tag_is_surfaced_and_set_unchanged() {
        let (mut store, wt_id) = store_with_worktree();
        store.add_tag(wt_id, "wip").unwrap();

        let err = store.add_tag(wt_id, "wip").unwrap_err();

        assert!(matches!(
            err,
            StoreError::DuplicateTag { worktree_id, ref name }
                if worktree_id == wt_id && name == "wip"
        ));
        assert_eq!(store.list_tags(wt_id).unwrap(), ["wip"]);
    }

    #[test]
    fn same_name_on_different_worktrees_is_fine() {
        let (mut store, wt_a) = store_with_worktree();
        let repo = store.repo_by_path("/repos/app").unwrap();
        let wt_b = store
            .create_worktree(repo.id, "other", "other", "/repos/app/.wt/other", None)
            .unwrap();

        store.add_tag(wt_a, "wip").unwrap();
        store.add_tag(wt_b.id, "wip").unwrap();

        assert_eq!(store.list_tags(wt_a).unwrap(), ["wip"]);
        assert_eq!(store.list_tags(wt_b.id).unwrap(), ["wip"]);
    }

    #[test]
    fn tagging_unknown_worktree_fails() {
        let mut store = Store::open_in_memory().expect("store should open");

        let err = store.add_tag(9, "wip").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Missing::Worktree(9))));
    }

    #[test]
    fn remove_reports_whether_a_tag_existed() {
        let (mut store, wt_id) = store_with_worktree();
        store.add_tag(wt_id, "wip").unwrap();

        assert!(store.remove_tag(wt_id, "wip").unwrap());
        assert!(!store.remove_tag(wt_id, "wip").unwrap());
        assert!(store.list_tags(wt_id).unwrap().is_empty());

        // Removal frees the name for re-adding.
        store.add_tag(wt_id, "wip").unwrap();
        assert_eq!(store.list_tags(wt_id).unwrap(), ["wip"]);
    }
}
