//! Repository lifecycle.

use chrono::Utc;
use tracing::info;

use lake_kv::KvTxn;
use lake_types::ContentHash;

use crate::branch;
use crate::error::{IndexError, IndexResult};
use crate::keys;
use crate::model::{Commit, Metadata, Repo, Tree};
use crate::names::{validate_branch_name, validate_repo_id};
use crate::objects::{get_json, put_json, scan_json, write_commit, write_tree};

/// Committer recorded on the initial commit of every repository.
pub const SYSTEM_COMMITTER: &str = "lake";

/// Message of the initial commit.
pub const INITIAL_COMMIT_MESSAGE: &str = "repository created";

/// Create a repository with an empty root commit on `default_branch`.
pub(crate) fn create(
    tx: &mut dyn KvTxn,
    hasher: &dyn ContentHash,
    id: &str,
    default_branch: &str,
) -> IndexResult<Repo> {
    validate_repo_id(id)?;
    validate_branch_name(default_branch)?;
    if tx.get(&keys::repo(id))?.is_some() {
        return Err(IndexError::invalid(format!("repository {id:?} already exists")));
    }

    let now = Utc::now();
    let root = write_tree(tx, hasher, id, &Tree::empty())?;
    let initial = Commit::new(
        hasher,
        root,
        None,
        SYSTEM_COMMITTER,
        INITIAL_COMMIT_MESSAGE,
        Metadata::new(),
        now,
    )?;
    write_commit(tx, id, &initial)?;
    branch::create(tx, id, default_branch, &initial.address)?;

    let repo = Repo {
        id: id.to_string(),
        default_branch: default_branch.to_string(),
        created_at: now,
    };
    put_json(tx, &keys::repo(id), &repo)?;
    info!(
        repo = id,
        default_branch,
        commit = %initial.address.short_hex(),
        "created repository"
    );
    Ok(repo)
}

pub(crate) fn get(tx: &mut dyn KvTxn, id: &str) -> IndexResult<Repo> {
    get_json(tx, &keys::repo(id))?.ok_or_else(|| IndexError::not_found("repository", id))
}

/// Every repository, ordered by id.
pub(crate) fn list(tx: &mut dyn KvTxn) -> IndexResult<Vec<Repo>> {
    Ok(scan_json::<Repo>(tx, &keys::repos())?
        .into_iter()
        .map(|(_, repo)| repo)
        .collect())
}

/// Remove a repository and every key it owns.
pub(crate) fn delete(tx: &mut dyn KvTxn, id: &str) -> IndexResult<()> {
    get(tx, id)?;
    let mut removed = 0usize;
    for prefix in keys::repo_namespaces(id) {
        for (key, _) in tx.scan_prefix(&prefix)? {
            tx.delete(&key)?;
            removed += 1;
        }
    }
    tx.delete(&keys::repo(id))?;
    info!(repo = id, keys_removed = removed, "deleted repository");
    Ok(())
}
