//! Per-branch staging area.
//!
//! The workspace is a flat map from full object path to [`Staged`] state,
//! stored one key per path. Nothing here knows about trees: tree chains are
//! rebuilt from the staged paths only when a commit is made.

use serde::{Deserialize, Serialize};

use lake_kv::KvTxn;

use crate::error::IndexResult;
use crate::keys;
use crate::model::Entry;
use crate::objects::{get_json, put_json, scan_json};
use crate::path::Path;

/// Staged state of a single path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "entry", rename_all = "lowercase")]
pub enum Staged {
    /// Added or updated; shadows any committed entry.
    Write(Entry),
    /// Pending delete of the committed entry at exactly this path.
    Tombstone,
}

impl Staged {
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Self::Write(entry) => Some(entry),
            Self::Tombstone => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone)
    }
}

/// Classification of a staged change relative to the branch HEAD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Nothing is committed at the path.
    Added,
    /// Replaces a committed entry.
    Modified,
    /// Tombstone.
    Deleted,
}

/// A staged change, as reported by
/// [`KvIndex::workspace_changes`](crate::KvIndex::workspace_changes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceChange {
    pub path: String,
    pub kind: ChangeKind,
    pub staged: Staged,
}

/// Handle on one branch's workspace keys.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Workspace<'a> {
    repo: &'a str,
    branch: &'a str,
}

impl<'a> Workspace<'a> {
    pub(crate) fn new(repo: &'a str, branch: &'a str) -> Self {
        Self { repo, branch }
    }

    pub(crate) fn get(&self, tx: &mut dyn KvTxn, path: &Path) -> IndexResult<Option<Staged>> {
        get_json(tx, &self.key(path))
    }

    /// Stage an add/update, replacing whatever was staged at `path`.
    pub(crate) fn write(&self, tx: &mut dyn KvTxn, path: &Path, entry: &Entry) -> IndexResult<()> {
        put_json(tx, &self.key(path), &Staged::Write(entry.clone()))
    }

    pub(crate) fn tombstone(&self, tx: &mut dyn KvTxn, path: &Path) -> IndexResult<()> {
        put_json(tx, &self.key(path), &Staged::Tombstone)
    }

    /// Drop staged state at exactly `path`. Returns `true` if any existed.
    pub(crate) fn discard(&self, tx: &mut dyn KvTxn, path: &Path) -> IndexResult<bool> {
        let key = self.key(path);
        let existed = tx.get(&key)?.is_some();
        if existed {
            tx.delete(&key)?;
        }
        Ok(existed)
    }

    /// Every staged path under the tree path `prefix`, sorted by path.
    pub(crate) fn list(&self, tx: &mut dyn KvTxn, prefix: &Path) -> IndexResult<Vec<(Path, Staged)>> {
        let scan = keys::workspace(self.repo, self.branch, prefix.as_str());
        let mut out = Vec::new();
        for (key, staged) in scan_json::<Staged>(tx, &scan)? {
            if let Some(raw) = keys::workspace_path(self.repo, self.branch, &key) {
                out.push((Path::parse(raw)?, staged));
            }
        }
        Ok(out)
    }

    /// Drop every staged path under `prefix`. Returns how many were dropped.
    pub(crate) fn discard_under(&self, tx: &mut dyn KvTxn, prefix: &Path) -> IndexResult<usize> {
        let staged = self.list(tx, prefix)?;
        for (path, _) in &staged {
            tx.delete(&self.key(path))?;
        }
        Ok(staged.len())
    }

    fn key(&self, path: &Path) -> Vec<u8> {
        keys::workspace_entry(self.repo, self.branch, path.as_str())
    }
}
