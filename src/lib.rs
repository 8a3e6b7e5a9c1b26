//! Local state store for the `trench` git worktree manager.
//!
//! Tracks registered repos, the worktrees under them, the lifecycle events
//! those worktrees go through, per-event output streams, worktree tags, and
//! singleton session state. Everything lives in one SQLite database; every
//! mutating operation is atomic, and events and log lines are append-only.
//!
//! The git operations, process execution, and CLI surfaces of the tool are
//! external collaborators that call into [`Store`].

mod config;
mod db;
mod error;
mod events;
mod logs;
mod paths;
mod repos;
mod session;
mod store;
mod tags;
mod worktrees;

pub use config::{Config, ConfigError, DatabaseConfig, GitConfig};
pub use db::CURRENT_SCHEMA_VERSION;
pub use error::{Missing, StoreError};
pub use events::Event;
pub use logs::LogLine;
pub use paths::{config_path, data_dir, db_path};
pub use repos::Repo;
pub use store::Store;
pub use tags::Tag;
pub use worktrees::{Worktree, WorktreeUpdate};
