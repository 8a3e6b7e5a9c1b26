use std::error::Error;
use std::fmt;

/// Names the entity a failed lookup was after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Repo(i64),
    RepoPath(String),
    Worktree(i64),
    WorktreePath(String),
    Event(i64),
    SessionKey(String),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Repo(id) => write!(f, "repo {}", id),
            Missing::RepoPath(path) => write!(f, "repo at path '{}'", path),
            Missing::Worktree(id) => write!(f, "worktree {}", id),
            Missing::WorktreePath(path) => write!(f, "worktree at path '{}'", path),
            Missing::Event(id) => write!(f, "event {}", id),
            Missing::SessionKey(key) => write!(f, "session key '{}'", key),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// A repo or worktree path is already registered.
    DuplicatePath(String),
    /// The (worktree, name) tag pair already exists.
    DuplicateTag { worktree_id: i64, name: String },
    /// An event named a worktree owned by a different repo.
    InvariantViolation {
        repo_id: i64,
        worktree_id: i64,
        owner_repo_id: i64,
    },
    NotFound(Missing),
    Io(std::io::Error),
    Db(rusqlite::Error),
    Json(serde_json::Error),
    Config(crate::config::ConfigError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicatePath(path) => {
                write!(f, "path '{}' is already registered", path)
            }
            StoreError::DuplicateTag { worktree_id, name } => {
                write!(f, "tag '{}' already exists on worktree {}", name, worktree_id)
            }
            StoreError::InvariantViolation {
                repo_id,
                worktree_id,
                owner_repo_id,
            } => write!(
                f,
                "worktree {} belongs to repo {}, not repo {}",
                worktree_id, owner_repo_id, repo_id
            ),
            StoreError::NotFound(missing) => write!(f, "{} not found", missing),
            StoreError::Io(err) => write!(f, "I/O error: {}", err),
            StoreError::Db(err) => write!(f, "database error: {}", err),
            StoreError::Json(err) => write!(f, "payload JSON error: {}", err),
            StoreError::Config(err) => write!(f, "config error: {}", err),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::Db(err) => Some(err),
            StoreError::Json(err) => Some(err),
            StoreError::Config(err) => Some(err),
            StoreError::DuplicatePath(_)
            | StoreError::DuplicateTag { .. }
            | StoreError::InvariantViolation { .. }
            | StoreError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Json(value)
    }
}

impl From<crate::config::ConfigError> for StoreError {
    fn from(value: crate::config::ConfigError) -> Self {
        StoreError::Config(value)
    }
}
