//! Branch pointers.
//!
//! A branch is one record holding the address of its HEAD commit. Moving a
//! branch is a single key overwrite, so it is atomic with respect to the
//! transaction that moves it.

use tracing::debug;

use lake_kv::KvTxn;
use lake_types::Address;

use crate::error::{IndexError, IndexResult};
use crate::keys;
use crate::model::Branch;
use crate::names::validate_branch_name;
use crate::objects::{get_json, put_json, read_commit, scan_json};
use crate::path::Path;
use crate::workspace::Workspace;

pub(crate) fn get(tx: &mut dyn KvTxn, repo: &str, name: &str) -> IndexResult<Branch> {
    get_json(tx, &keys::branch(repo, name))?.ok_or_else(|| IndexError::not_found("branch", name))
}

pub(crate) fn put(tx: &mut dyn KvTxn, repo: &str, branch: &Branch) -> IndexResult<()> {
    put_json(tx, &keys::branch(repo, &branch.name), branch)
}

/// Create `name` pointing at the existing commit `source`.
pub(crate) fn create(
    tx: &mut dyn KvTxn,
    repo: &str,
    name: &str,
    source: &Address,
) -> IndexResult<Branch> {
    validate_branch_name(name)?;
    if tx.get(&keys::branch(repo, name))?.is_some() {
        return Err(IndexError::invalid(format!("branch {name:?} already exists")));
    }
    read_commit(tx, repo, source)?;

    let branch = Branch {
        name: name.to_string(),
        commit: *source,
    };
    put(tx, repo, &branch)?;
    debug!(repo, branch = name, commit = %source.short_hex(), "created branch");
    Ok(branch)
}

/// Every branch of a repository, ordered by name.
pub(crate) fn list(tx: &mut dyn KvTxn, repo: &str) -> IndexResult<Vec<Branch>> {
    Ok(scan_json::<Branch>(tx, &keys::branches(repo))?
        .into_iter()
        .map(|(_, branch)| branch)
        .collect())
}

/// Remove a branch and everything staged on it.
///
/// Commits stay; they may be shared with other branches.
pub(crate) fn delete(
    tx: &mut dyn KvTxn,
    repo: &str,
    name: &str,
    default_branch: &str,
) -> IndexResult<()> {
    if name == default_branch {
        return Err(IndexError::invalid(format!(
            "cannot delete default branch {name:?}"
        )));
    }
    get(tx, repo, name)?;
    let dropped = Workspace::new(repo, name).discard_under(tx, &Path::root())?;
    tx.delete(&keys::branch(repo, name))?;
    debug!(repo, branch = name, dropped, "deleted branch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use lake_kv::{transact, InMemoryKvStore};
    use lake_types::Blake3Hasher;

    use crate::model::{Commit, Entry, Metadata, Tree};
    use crate::objects::{write_commit, write_tree};

    fn seed(store: &InMemoryKvStore) -> Address {
        let h = Blake3Hasher::new();
        transact(store, |tx| {
            let tree = write_tree(tx, &h, "r", &Tree::empty())?;
            let commit = Commit::new(
                &h,
                tree,
                None,
                "t",
                "init",
                Metadata::new(),
                DateTime::<Utc>::UNIX_EPOCH,
            )?;
            write_commit(tx, "r", &commit)?;
            Ok::<_, IndexError>(commit.address)
        })
        .unwrap()
    }

    #[test]
    fn create_get_list() {
        let store = InMemoryKvStore::new();
        let head = seed(&store);
        transact(&store, |tx| {
            create(tx, "r", "main", &head)?;
            create(tx, "r", "dev", &head)?;
            Ok::<_, IndexError>(())
        })
        .unwrap();

        let dev = transact(&store, |tx| get(tx, "r", "dev")).unwrap();
        assert_eq!(dev.commit, head);
        let names: Vec<String> = transact(&store, |tx| list(tx, "r"))
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["dev", "main"]);
    }

    #[test]
    fn duplicate_is_invalid() {
        let store = InMemoryKvStore::new();
        let head = seed(&store);
        transact(&store, |tx| create(tx, "r", "main", &head)).unwrap();
        let err = transact(&store, |tx| create(tx, "r", "main", &head)).unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_source_commit_is_not_found() {
        let store = InMemoryKvStore::new();
        let err = transact(&store, |tx| {
            create(tx, "r", "dev", &Address::from_hash([9; 32]))
        })
        .unwrap_err();
        assert!(matches!(err, IndexError::NotFound { what: "commit", .. }));
    }

    #[test]
    fn bad_name_is_invalid() {
        let store = InMemoryKvStore::new();
        let head = seed(&store);
        let err = transact(&store, |tx| create(tx, "r", "a/b", &head)).unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument(_)));
    }

    #[test]
    fn delete_drops_workspace_but_not_default() {
        let store = InMemoryKvStore::new();
        let head = seed(&store);
        transact(&store, |tx| {
            create(tx, "r", "main", &head)?;
            create(tx, "r", "dev", &head)?;
            Workspace::new("r", "dev").write(tx, &Path::parse("x")?, &Entry::object("x"))?;
            Ok::<_, IndexError>(())
        })
        .unwrap();

        let err = transact(&store, |tx| delete(tx, "r", "main", "main")).unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument(_)));

        transact(&store, |tx| delete(tx, "r", "dev", "main")).unwrap();
        let err = transact(&store, |tx| get(tx, "r", "dev")).unwrap_err();
        assert!(matches!(err, IndexError::NotFound { what: "branch", .. }));
        let staged = transact(&store, |tx| Workspace::new("r", "dev").list(tx, &Path::root())).unwrap();
        assert!(staged.is_empty());
    }
}
