//! Versioned index for a data-lake object store.
//!
//! Gives a flat key-value store git-like semantics: content-addressed
//! immutable trees and commits, mutable branch pointers, a per-branch
//! staging workspace, and revert at object, subtree, or commit granularity.
//! The index never owns object bytes; entries only reference them.
//!
//! # Key Types
//!
//! - [`KvIndex`] -- The facade every operation goes through
//! - [`Entry`], [`Tree`], [`Commit`] -- Immutable history
//! - [`Branch`], [`Repo`] -- Mutable records pointing into history
//! - [`Path`] -- Validated object and tree paths
//! - [`WorkspaceChange`] -- A staged change and how it relates to HEAD
//! - [`IndexConfig`] -- Tunables
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lake_index::{Entry, KvIndex};
//! use lake_kv::InMemoryKvStore;
//!
//! let index = KvIndex::new(Arc::new(InMemoryKvStore::new()));
//! let repo = index.create_repo("lake", None).unwrap();
//! index
//!     .write_entry("lake", &repo.default_branch, "raw/events.parquet", &Entry::object("events.parquet"))
//!     .unwrap();
//! let commit = index
//!     .commit("lake", &repo.default_branch, "ingest", "etl", None)
//!     .unwrap();
//! assert!(commit.parent.is_some());
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod names;
pub mod path;

mod branch;
mod commit;
mod keys;
mod objects;
mod repo;
mod resolve;
mod revert;
mod workspace;

pub use config::IndexConfig;
pub use error::{IndexError, IndexResult};
pub use index::KvIndex;
pub use model::{Branch, Commit, Entry, EntryType, Metadata, Repo, Tree};
pub use path::Path;
pub use repo::{INITIAL_COMMIT_MESSAGE, SYSTEM_COMMITTER};
pub use workspace::{ChangeKind, Staged, WorkspaceChange};
