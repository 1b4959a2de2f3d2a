//! Reverting staged state and branch pointers.
//!
//! None of these touch persisted trees or commits; they only discard
//! workspace keys or move a branch.

use tracing::debug;

use lake_kv::KvTxn;
use lake_types::Address;

use crate::branch;
use crate::commit::is_ancestor;
use crate::error::{IndexError, IndexResult};
use crate::objects::read_commit;
use crate::path::Path;
use crate::resolve::{committed_object, committed_tree, head_tree};
use crate::workspace::Workspace;

/// Drop whatever is staged at the object path `path`.
///
/// Succeeds when something was staged or a committed entry exists there.
pub(crate) fn revert_object(
    tx: &mut dyn KvTxn,
    repo: &str,
    branch_name: &str,
    path: &Path,
) -> IndexResult<()> {
    let branch = branch::get(tx, repo, branch_name)?;
    let discarded = Workspace::new(repo, branch_name).discard(tx, path)?;
    if !discarded {
        let root = head_tree(tx, repo, &branch)?;
        if committed_object(tx, repo, &root, path)?.is_none() {
            return Err(IndexError::not_found("path", path.as_str()));
        }
    }
    debug!(repo, branch = branch_name, path = %path, discarded, "reverted object");
    Ok(())
}

/// Drop everything staged under `prefix`; `""` means the whole branch.
///
/// Returns how many staged paths were discarded.
pub(crate) fn revert_path(
    tx: &mut dyn KvTxn,
    repo: &str,
    branch_name: &str,
    prefix: &Path,
) -> IndexResult<usize> {
    let prefix = prefix.to_tree();
    let branch = branch::get(tx, repo, branch_name)?;
    let discarded = Workspace::new(repo, branch_name).discard_under(tx, &prefix)?;
    if discarded == 0 {
        let root = head_tree(tx, repo, &branch)?;
        if committed_tree(tx, repo, &root, &prefix.segments())?.is_none() {
            return Err(IndexError::not_found("tree", prefix.as_str()));
        }
    }
    debug!(repo, branch = branch_name, prefix = %prefix, discarded, "reverted path");
    Ok(discarded)
}

/// Point the branch at the ancestor `target` and clear its workspace.
pub(crate) fn revert_commit(
    tx: &mut dyn KvTxn,
    repo: &str,
    branch_name: &str,
    target: &Address,
    max_depth: usize,
) -> IndexResult<()> {
    let mut branch = branch::get(tx, repo, branch_name)?;
    read_commit(tx, repo, target)?;
    if !is_ancestor(tx, repo, &branch.commit, target, max_depth)? {
        return Err(IndexError::invalid(format!(
            "commit {} is not in the history of branch {branch_name:?}",
            target.short_hex()
        )));
    }

    let from = branch.commit;
    branch.commit = *target;
    branch::put(tx, repo, &branch)?;
    let discarded = Workspace::new(repo, branch_name).discard_under(tx, &Path::root())?;
    debug!(
        repo,
        branch = branch_name,
        from = %from.short_hex(),
        to = %target.short_hex(),
        discarded,
        "reverted branch"
    );
    Ok(())
}
