//! The commit graph: materializing a workspace into immutable trees and a
//! new commit, and walking history.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use tracing::debug;

use lake_kv::KvTxn;
use lake_types::{Address, ContentHash};

use crate::branch;
use crate::error::{IndexError, IndexResult};
use crate::model::{Commit, Entry, EntryType, Metadata, Tree};
use crate::objects::{read_commit, read_tree, write_commit, write_tree};
use crate::path::{Path, SEPARATOR};
use crate::workspace::{Staged, Workspace};

/// Relative path inside a tree -> staged write, or `None` for a tombstone.
type Changes = BTreeMap<String, Option<Entry>>;

/// Caller-supplied commit fields.
#[derive(Clone, Debug, Default)]
pub struct CommitRequest {
    pub message: String,
    pub committer: String,
    pub metadata: Metadata,
}

impl CommitRequest {
    pub fn new(message: impl Into<String>, committer: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            committer: committer.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Rebuilds trees along changed prefixes, reusing untouched subtrees.
struct TreeBuilder<'a> {
    tx: &'a mut dyn KvTxn,
    hasher: &'a dyn ContentHash,
    repo: &'a str,
    rewritten: usize,
}

impl TreeBuilder<'_> {
    /// Apply `changes` to the tree at `base`.
    ///
    /// Returns the new address, or `None` when a non-root tree ends up
    /// empty and should be dropped from its parent.
    fn rebuild(
        &mut self,
        base: Option<Address>,
        changes: Changes,
        is_root: bool,
    ) -> IndexResult<Option<Address>> {
        let mut tree = match base {
            Some(address) => read_tree(self.tx, self.repo, &address)?,
            None => Tree::empty(),
        };

        let mut nested: BTreeMap<String, Changes> = BTreeMap::new();
        for (rel, change) in changes {
            let split = rel
                .split_once(SEPARATOR)
                .map(|(child, rest)| (child.to_string(), rest.to_string()));
            match split {
                Some((child, rest)) => {
                    nested.entry(child).or_default().insert(rest, change);
                }
                None => match change {
                    Some(mut entry) => {
                        entry.name = rel;
                        entry.entry_type = EntryType::Object;
                        tree.upsert(entry);
                    }
                    None => {
                        tree.remove(&rel, EntryType::Object);
                    }
                },
            }
        }

        for (child, sub) in nested {
            let current = tree.get(&child, EntryType::Tree).and_then(|e| e.address);
            match self.rebuild(current, sub, false)? {
                Some(address) => tree.upsert(Entry::tree(child, address)),
                None => {
                    tree.remove(&child, EntryType::Tree);
                }
            }
        }

        if tree.is_empty() && !is_root {
            return Ok(None);
        }
        self.rewritten += 1;
        write_tree(self.tx, self.hasher, self.repo, &tree).map(Some)
    }
}

/// Merge the branch workspace into HEAD's tree and advance the branch.
pub(crate) fn commit(
    tx: &mut dyn KvTxn,
    hasher: &dyn ContentHash,
    repo: &str,
    branch_name: &str,
    request: &CommitRequest,
) -> IndexResult<Commit> {
    let mut branch = branch::get(tx, repo, branch_name)?;
    let parent = read_commit(tx, repo, &branch.commit)?;

    let ws = Workspace::new(repo, branch_name);
    let staged = ws.list(tx, &Path::root())?;
    let changes: Changes = staged
        .iter()
        .map(|(path, state)| {
            let change = match state {
                Staged::Write(entry) => Some(entry.clone()),
                Staged::Tombstone => None,
            };
            (path.as_str().to_string(), change)
        })
        .collect();

    let (tree, rewritten) = if changes.is_empty() {
        (parent.tree, 0)
    } else {
        let mut builder = TreeBuilder {
            tx: &mut *tx,
            hasher,
            repo,
            rewritten: 0,
        };
        let root = builder
            .rebuild(Some(parent.tree), changes, true)?
            .ok_or_else(|| IndexError::invalid("root tree vanished during commit"))?;
        (root, builder.rewritten)
    };

    let commit = Commit::new(
        hasher,
        tree,
        Some(parent.address),
        request.committer.clone(),
        request.message.clone(),
        request.metadata.clone(),
        Utc::now(),
    )?;
    write_commit(tx, repo, &commit)?;

    branch.commit = commit.address;
    branch::put(tx, repo, &branch)?;
    ws.discard_under(tx, &Path::root())?;

    debug!(
        repo,
        branch = branch_name,
        commit = %commit.address.short_hex(),
        parent = %parent.address.short_hex(),
        staged = staged.len(),
        trees_rewritten = rewritten,
        "committed workspace"
    );
    Ok(commit)
}

/// Commits reachable from `head` by parent links, newest first.
pub(crate) fn log(
    tx: &mut dyn KvTxn,
    repo: &str,
    head: &Address,
    limit: usize,
    max_depth: usize,
) -> IndexResult<Vec<Commit>> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(*head);
    while let Some(address) = next {
        if out.len() >= limit || out.len() >= max_depth || !seen.insert(address) {
            break;
        }
        let commit = read_commit(tx, repo, &address)?;
        next = commit.parent;
        out.push(commit);
    }
    Ok(out)
}

/// Whether `target` is `head` or one of its ancestors.
///
/// The walk is bounded by `max_depth` hops and stops on a revisited address.
pub(crate) fn is_ancestor(
    tx: &mut dyn KvTxn,
    repo: &str,
    head: &Address,
    target: &Address,
    max_depth: usize,
) -> IndexResult<bool> {
    let mut seen = HashSet::new();
    let mut next = Some(*head);
    while let Some(address) = next {
        if address == *target {
            return Ok(true);
        }
        if seen.len() >= max_depth || !seen.insert(address) {
            return Ok(false);
        }
        next = read_commit(tx, repo, &address)?.parent;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lake_kv::{transact, InMemoryKvStore};
    use lake_types::Blake3Hasher;

    use crate::model::Branch;
    use crate::objects::read_tree;

    fn seeded() -> (InMemoryKvStore, Blake3Hasher) {
        let store = InMemoryKvStore::new();
        let h = Blake3Hasher::new();
        transact(&store, |tx| {
            let tree = write_tree(tx, &h, "r", &Tree::empty())?;
            let init = Commit::new(&h, tree, None, "t", "init", Metadata::new(), Utc::now())?;
            write_commit(tx, "r", &init)?;
            branch::put(
                tx,
                "r",
                &Branch {
                    name: "main".into(),
                    commit: init.address,
                },
            )
        })
        .unwrap();
        (store, h)
    }

    fn stage(store: &InMemoryKvStore, path: &str) {
        let p = Path::parse(path).unwrap();
        let name = p.basename().to_string();
        transact(store, |tx| Workspace::new("r", "main").write(tx, &p, &Entry::object(name.clone())))
            .unwrap();
    }

    fn commit_now(store: &InMemoryKvStore, h: &Blake3Hasher, message: &str) -> Commit {
        let request = CommitRequest::new(message, "t");
        transact(store, |tx| commit(tx, h, "r", "main", &request)).unwrap()
    }

    #[test]
    fn nested_paths_become_subtrees() {
        let (store, h) = seeded();
        stage(&store, "a/b/c");
        stage(&store, "a/d");
        let c = commit_now(&store, &h, "m");

        let (root, a) = transact(&store, |tx| {
            let root = read_tree(tx, "r", &c.tree)?;
            let a = root.get("a", EntryType::Tree).and_then(|e| e.address);
            let a = read_tree(tx, "r", &a.unwrap())?;
            Ok::<_, IndexError>((root, a))
        })
        .unwrap();
        assert_eq!(root.len(), 1);
        assert!(a.get("d", EntryType::Object).is_some());
        assert!(a.get("b", EntryType::Tree).is_some());
    }

    #[test]
    fn object_and_subtree_share_a_name() {
        let (store, h) = seeded();
        stage(&store, "foo");
        stage(&store, "foo/bar");
        let c = commit_now(&store, &h, "m");
        let root = transact(&store, |tx| read_tree(tx, "r", &c.tree)).unwrap();
        assert_eq!(root.len(), 2);
        assert!(root.get("foo", EntryType::Object).is_some());
        assert!(root.get("foo", EntryType::Tree).is_some());
    }

    #[test]
    fn same_content_same_tree_address() {
        let (store, h) = seeded();
        stage(&store, "x/y");
        let first = commit_now(&store, &h, "one");

        let (other, _) = seeded();
        stage(&other, "x/y");
        let second = commit_now(&other, &h, "two");
        assert_eq!(first.tree, second.tree);
    }

    #[test]
    fn ancestry_is_bounded() {
        let (store, h) = seeded();
        let one = commit_now(&store, &h, "one");
        let two = commit_now(&store, &h, "two");
        let three = commit_now(&store, &h, "three");

        let check = |target: &Address, depth: usize| {
            transact(&store, |tx| is_ancestor(tx, "r", &three.address, target, depth)).unwrap()
        };
        assert!(check(&three.address, 0));
        assert!(check(&two.address, 1));
        assert!(check(&one.address, 10));
        assert!(!check(&one.address, 1));
        assert!(!check(&Address::from_hash([1; 32]), 10));
    }

    #[test]
    fn log_is_newest_first_and_limited() {
        let (store, h) = seeded();
        commit_now(&store, &h, "one");
        let two = commit_now(&store, &h, "two");
        let history = transact(&store, |tx| log(tx, "r", &two.address, 10, 100)).unwrap();
        let messages: Vec<&str> = history.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "one", "init"]);
        let capped = transact(&store, |tx| log(tx, "r", &two.address, 10, 2)).unwrap();
        assert_eq!(capped.len(), 2);
    }
}
