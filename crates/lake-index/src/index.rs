//! The [`KvIndex`] facade.
//!
//! Every public operation runs inside one store transaction. When the store
//! reports a conflicting concurrent update, the whole operation is re-run
//! from scratch up to [`IndexConfig::conflict_retries`] times.

use std::sync::Arc;

use tracing::debug;

use lake_kv::{KvStore, KvTxn};
use lake_types::{Address, Blake3Hasher, ContentHash};

use crate::branch;
use crate::commit::{self, CommitRequest};
use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::model::{Branch, Commit, Entry, EntryType, Metadata, Repo};
use crate::objects::read_commit;
use crate::path::{Path, SEPARATOR};
use crate::repo;
use crate::resolve::{self, committed_object, head_tree};
use crate::revert;
use crate::workspace::{ChangeKind, Staged, Workspace, WorkspaceChange};

/// Versioned index over a transactional key-value store.
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct KvIndex {
    store: Arc<dyn KvStore>,
    hasher: Arc<dyn ContentHash>,
    config: IndexConfig,
}

impl std::fmt::Debug for KvIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvIndex")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl KvIndex {
    /// An index with default configuration and BLAKE3 addressing.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_config(store, IndexConfig::default())
    }

    pub fn with_config(store: Arc<dyn KvStore>, config: IndexConfig) -> Self {
        Self {
            store,
            hasher: Arc::new(Blake3Hasher::new()),
            config,
        }
    }

    /// Replace the content hasher. Every index sharing a store must use the
    /// same one.
    pub fn with_hasher(mut self, hasher: Arc<dyn ContentHash>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    // ---------------------------------------------------------------
    // Repositories
    // ---------------------------------------------------------------

    /// Create a repository. Its default branch starts at an empty commit.
    pub fn create_repo(&self, id: &str, default_branch: Option<&str>) -> IndexResult<Repo> {
        let default_branch = default_branch.unwrap_or(&self.config.default_branch);
        self.transact("create_repo", |tx| {
            repo::create(tx, self.hasher.as_ref(), id, default_branch)
        })
    }

    pub fn get_repo(&self, id: &str) -> IndexResult<Repo> {
        self.transact("get_repo", |tx| repo::get(tx, id))
    }

    pub fn list_repos(&self) -> IndexResult<Vec<Repo>> {
        self.transact("list_repos", |tx| repo::list(tx))
    }

    /// Delete a repository with all of its history and workspaces.
    pub fn delete_repo(&self, id: &str) -> IndexResult<()> {
        self.transact("delete_repo", |tx| repo::delete(tx, id))
    }

    // ---------------------------------------------------------------
    // Entries
    // ---------------------------------------------------------------

    /// Stage `entry` on a branch.
    ///
    /// The entry lands in the directory part of `path` under its own name,
    /// so `path` may be either a directory (`"a/"`, `""`) or the full object
    /// path whose basename equals `entry.name`.
    pub fn write_entry(
        &self,
        repo_id: &str,
        branch_name: &str,
        path: &str,
        entry: &Entry,
    ) -> IndexResult<()> {
        let target = object_path_for(path, entry)?;
        let mut staged = entry.clone();
        staged.entry_type = EntryType::Object;
        self.transact("write_entry", |tx| {
            repo::get(tx, repo_id)?;
            branch::get(tx, repo_id, branch_name)?;
            Workspace::new(repo_id, branch_name).write(tx, &target, &staged)
        })?;
        debug!(repo = repo_id, branch = branch_name, path = %target, "staged entry");
        Ok(())
    }

    /// Resolve an object path: staged state first, then HEAD.
    pub fn read_entry(&self, repo_id: &str, branch_name: &str, path: &str) -> IndexResult<Entry> {
        let path = object_path(path)?;
        self.transact("read_entry", |tx| {
            let branch = branch::get(tx, repo_id, branch_name)?;
            resolve::read_entry(tx, repo_id, &branch, &path)
        })
    }

    /// Stage the deletion of an object visible on the branch.
    pub fn delete_object(&self, repo_id: &str, branch_name: &str, path: &str) -> IndexResult<()> {
        let path = object_path(path)?;
        self.transact("delete_object", |tx| {
            let branch = branch::get(tx, repo_id, branch_name)?;
            resolve::read_entry(tx, repo_id, &branch, &path)?;
            Workspace::new(repo_id, branch_name).tombstone(tx, &path)
        })?;
        debug!(repo = repo_id, branch = branch_name, path = %path, "staged delete");
        Ok(())
    }

    /// Direct children of the directory `path`, merged with staged changes.
    pub fn list_entries(
        &self,
        repo_id: &str,
        branch_name: &str,
        path: &str,
    ) -> IndexResult<Vec<Entry>> {
        let dir = Path::parse(path)?;
        self.transact("list_entries", |tx| {
            let branch = branch::get(tx, repo_id, branch_name)?;
            resolve::list_entries(tx, repo_id, &branch, &dir)
        })
    }

    /// Every staged change on a branch, classified against HEAD.
    pub fn workspace_changes(
        &self,
        repo_id: &str,
        branch_name: &str,
    ) -> IndexResult<Vec<WorkspaceChange>> {
        self.transact("workspace_changes", |tx| {
            let branch = branch::get(tx, repo_id, branch_name)?;
            let root = head_tree(tx, repo_id, &branch)?;
            let staged = Workspace::new(repo_id, branch_name).list(tx, &Path::root())?;
            let mut changes = Vec::with_capacity(staged.len());
            for (path, state) in staged {
                let kind = match state {
                    Staged::Tombstone => ChangeKind::Deleted,
                    Staged::Write(_) => match committed_object(tx, repo_id, &root, &path)? {
                        Some(_) => ChangeKind::Modified,
                        None => ChangeKind::Added,
                    },
                };
                changes.push(WorkspaceChange {
                    path: path.as_str().to_string(),
                    kind,
                    staged: state,
                });
            }
            Ok(changes)
        })
    }

    // ---------------------------------------------------------------
    // Commits
    // ---------------------------------------------------------------

    /// Materialize the branch workspace into a new commit on top of HEAD.
    ///
    /// An empty workspace still yields a new commit, sharing HEAD's tree.
    pub fn commit(
        &self,
        repo_id: &str,
        branch_name: &str,
        message: &str,
        committer: &str,
        metadata: Option<Metadata>,
    ) -> IndexResult<Commit> {
        let request =
            CommitRequest::new(message, committer).with_metadata(metadata.unwrap_or_default());
        self.transact("commit", |tx| {
            repo::get(tx, repo_id)?;
            commit::commit(tx, self.hasher.as_ref(), repo_id, branch_name, &request)
        })
    }

    pub fn get_commit(&self, repo_id: &str, address: &Address) -> IndexResult<Commit> {
        self.transact("get_commit", |tx| {
            repo::get(tx, repo_id)?;
            read_commit(tx, repo_id, address)
        })
    }

    /// Up to `limit` commits from the branch HEAD backwards.
    pub fn commit_log(
        &self,
        repo_id: &str,
        branch_name: &str,
        limit: usize,
    ) -> IndexResult<Vec<Commit>> {
        self.transact("commit_log", |tx| {
            let branch = branch::get(tx, repo_id, branch_name)?;
            commit::log(
                tx,
                repo_id,
                &branch.commit,
                limit,
                self.config.max_history_depth,
            )
        })
    }

    // ---------------------------------------------------------------
    // Branches
    // ---------------------------------------------------------------

    /// Create a branch at an existing commit.
    pub fn create_branch(
        &self,
        repo_id: &str,
        branch_name: &str,
        source: &Address,
    ) -> IndexResult<Branch> {
        self.transact("create_branch", |tx| {
            repo::get(tx, repo_id)?;
            branch::create(tx, repo_id, branch_name, source)
        })
    }

    pub fn get_branch(&self, repo_id: &str, branch_name: &str) -> IndexResult<Branch> {
        self.transact("get_branch", |tx| branch::get(tx, repo_id, branch_name))
    }

    pub fn list_branches(&self, repo_id: &str) -> IndexResult<Vec<Branch>> {
        self.transact("list_branches", |tx| {
            repo::get(tx, repo_id)?;
            branch::list(tx, repo_id)
        })
    }

    /// Delete a branch and its workspace. The default branch cannot be
    /// deleted.
    pub fn delete_branch(&self, repo_id: &str, branch_name: &str) -> IndexResult<()> {
        self.transact("delete_branch", |tx| {
            let repo = repo::get(tx, repo_id)?;
            branch::delete(tx, repo_id, branch_name, &repo.default_branch)
        })
    }

    // ---------------------------------------------------------------
    // Revert
    // ---------------------------------------------------------------

    /// Discard staged state at one object path.
    pub fn revert_object(&self, repo_id: &str, branch_name: &str, path: &str) -> IndexResult<()> {
        let path = object_path(path)?;
        self.transact("revert_object", |tx| {
            revert::revert_object(tx, repo_id, branch_name, &path)
        })
    }

    /// Discard every staged change under `prefix`. `""` reverts the whole
    /// workspace.
    pub fn revert_path(&self, repo_id: &str, branch_name: &str, prefix: &str) -> IndexResult<()> {
        let prefix = Path::parse(prefix)?;
        self.transact("revert_path", |tx| {
            revert::revert_path(tx, repo_id, branch_name, &prefix)
        })?;
        Ok(())
    }

    /// Reset the branch to an ancestor commit and clear its workspace.
    pub fn revert_commit(
        &self,
        repo_id: &str,
        branch_name: &str,
        target: &Address,
    ) -> IndexResult<()> {
        self.transact("revert_commit", |tx| {
            revert::revert_commit(
                tx,
                repo_id,
                branch_name,
                target,
                self.config.max_history_depth,
            )
        })
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn transact<T, F>(&self, op: &'static str, mut f: F) -> IndexResult<T>
    where
        F: FnMut(&mut dyn KvTxn) -> IndexResult<T>,
    {
        let mut attempt = 0u32;
        loop {
            match lake_kv::transact(self.store.as_ref(), &mut f) {
                Err(IndexError::Conflict(key)) if attempt < self.config.conflict_retries => {
                    attempt += 1;
                    debug!(op, attempt, key = %key, "retrying after concurrent update");
                }
                other => return other,
            }
        }
    }
}

/// Parse a path that must name an object.
fn object_path(raw: &str) -> IndexResult<Path> {
    let path = Path::parse(raw)?;
    if path.is_tree() {
        return Err(IndexError::invalid(format!(
            "{raw:?} is a tree path, expected an object path"
        )));
    }
    Ok(path)
}

/// Where `entry` lands when written at `raw`.
fn object_path_for(raw: &str, entry: &Entry) -> IndexResult<Path> {
    if entry.name.is_empty() || entry.name.contains(SEPARATOR) {
        return Err(IndexError::invalid(format!(
            "entry name {:?} must be a single non-empty segment",
            entry.name
        )));
    }
    let path = Path::parse(raw)?;
    let base = path.basename();
    if !base.is_empty() && base != entry.name {
        return Err(IndexError::invalid(format!(
            "path {raw:?} does not end in entry name {:?}",
            entry.name
        )));
    }
    Path::join(path.dirname(), &entry.name)
}
