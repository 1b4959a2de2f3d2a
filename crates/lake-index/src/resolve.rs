//! Path resolution against a branch: workspace first, then the committed
//! tree chain rooted at HEAD.

use std::collections::BTreeMap;

use lake_kv::KvTxn;
use lake_types::Address;

use crate::error::{IndexError, IndexResult};
use crate::model::{Branch, Entry, EntryType, Tree};
use crate::objects::{read_commit, read_tree};
use crate::path::{Path, SEPARATOR};
use crate::workspace::{Staged, Workspace};

/// Root tree address of the commit a branch points at.
pub(crate) fn head_tree(tx: &mut dyn KvTxn, repo: &str, branch: &Branch) -> IndexResult<Address> {
    Ok(read_commit(tx, repo, &branch.commit)?.tree)
}

/// Walk from `root` down one TREE entry per segment.
///
/// Returns `None` if a segment is missing or only exists as an object.
pub(crate) fn committed_tree(
    tx: &mut dyn KvTxn,
    repo: &str,
    root: &Address,
    segments: &[&str],
) -> IndexResult<Option<Tree>> {
    let mut tree = read_tree(tx, repo, root)?;
    for segment in segments {
        let next = match tree.get(segment, EntryType::Tree).and_then(|e| e.address) {
            Some(address) => address,
            None => return Ok(None),
        };
        tree = read_tree(tx, repo, &next)?;
    }
    Ok(Some(tree))
}

/// The committed OBJECT entry at `path`, if any.
pub(crate) fn committed_object(
    tx: &mut dyn KvTxn,
    repo: &str,
    root: &Address,
    path: &Path,
) -> IndexResult<Option<Entry>> {
    let dir = Path::parse(path.dirname())?;
    Ok(committed_tree(tx, repo, root, &dir.segments())?
        .and_then(|tree| tree.get(path.basename(), EntryType::Object).cloned()))
}

/// Resolve an object path as the branch currently sees it.
pub(crate) fn read_entry(
    tx: &mut dyn KvTxn,
    repo: &str,
    branch: &Branch,
    path: &Path,
) -> IndexResult<Entry> {
    let ws = Workspace::new(repo, &branch.name);
    match ws.get(tx, path)? {
        Some(Staged::Write(entry)) => return Ok(entry),
        Some(Staged::Tombstone) => return Err(IndexError::not_found("path", path.as_str())),
        None => {}
    }
    let root = head_tree(tx, repo, branch)?;
    committed_object(tx, repo, &root, path)?
        .ok_or_else(|| IndexError::not_found("path", path.as_str()))
}

/// The merged listing of one directory.
///
/// Committed entries are overlaid with staged writes and tombstones directly
/// in the directory; staged paths deeper down surface as TREE entries so the
/// listing reflects uncommitted subdirectories too.
pub(crate) fn list_entries(
    tx: &mut dyn KvTxn,
    repo: &str,
    branch: &Branch,
    dir: &Path,
) -> IndexResult<Vec<Entry>> {
    let dir = dir.to_tree();
    let root = head_tree(tx, repo, branch)?;
    let committed = committed_tree(tx, repo, &root, &dir.segments())?;
    let staged = Workspace::new(repo, &branch.name).list(tx, &dir)?;

    if committed.is_none() && staged.iter().all(|(_, s)| s.is_tombstone()) {
        return Err(IndexError::not_found("tree", dir.as_str()));
    }

    let mut merged: BTreeMap<(String, EntryType), Entry> = committed
        .map(|tree| {
            tree.entries()
                .iter()
                .map(|e| ((e.name.clone(), e.entry_type), e.clone()))
                .collect()
        })
        .unwrap_or_default();

    for (path, state) in staged {
        let rel = &path.as_str()[dir.as_str().len()..];
        match rel.split_once(SEPARATOR) {
            None => {
                let key = (rel.to_string(), EntryType::Object);
                match state {
                    Staged::Write(entry) => {
                        merged.insert(key, entry);
                    }
                    Staged::Tombstone => {
                        merged.remove(&key);
                    }
                }
            }
            Some((child, _)) => {
                if !state.is_tombstone() {
                    merged
                        .entry((child.to_string(), EntryType::Tree))
                        .or_insert_with(|| Entry {
                            name: child.to_string(),
                            entry_type: EntryType::Tree,
                            address: None,
                            size: 0,
                            timestamp: None,
                        });
                }
            }
        }
    }

    Ok(merged.into_values().collect())
}
