//! Storage key layout.
//!
//! ```text
//! repos/{repo}                          -> Repo
//! branches/{repo}/{branch}              -> Branch
//! commits/{repo}/{address}              -> Commit
//! trees/{repo}/{address}                -> Tree
//! workspace/{repo}/{branch}/{path}      -> Staged
//! ```
//!
//! Repository ids and branch names never contain `/`, so every prefix that
//! ends in `/` selects exactly one repository or branch.

use lake_types::Address;

const REPOS: &str = "repos/";
const BRANCHES: &str = "branches/";
const COMMITS: &str = "commits/";
const TREES: &str = "trees/";
const WORKSPACE: &str = "workspace/";

pub fn repo(repo: &str) -> Vec<u8> {
    format!("{REPOS}{repo}").into_bytes()
}

pub fn repos() -> Vec<u8> {
    REPOS.as_bytes().to_vec()
}

pub fn branch(repo: &str, branch: &str) -> Vec<u8> {
    format!("{BRANCHES}{repo}/{branch}").into_bytes()
}

pub fn branches(repo: &str) -> Vec<u8> {
    format!("{BRANCHES}{repo}/").into_bytes()
}

pub fn commit(repo: &str, address: &Address) -> Vec<u8> {
    format!("{COMMITS}{repo}/{address}").into_bytes()
}

pub fn tree(repo: &str, address: &Address) -> Vec<u8> {
    format!("{TREES}{repo}/{address}").into_bytes()
}

pub fn workspace_entry(repo: &str, branch: &str, path: &str) -> Vec<u8> {
    format!("{WORKSPACE}{repo}/{branch}/{path}").into_bytes()
}

/// Prefix covering every staged path under `path_prefix` on one branch.
pub fn workspace(repo: &str, branch: &str, path_prefix: &str) -> Vec<u8> {
    workspace_entry(repo, branch, path_prefix)
}

/// Recover the staged path from a full workspace key.
pub fn workspace_path<'k>(repo: &str, branch: &str, key: &'k [u8]) -> Option<&'k str> {
    let prefix = workspace(repo, branch, "");
    let rest = key.strip_prefix(prefix.as_slice())?;
    std::str::from_utf8(rest).ok()
}

/// Every namespace a repository owns, for deletion.
pub fn repo_namespaces(repo: &str) -> Vec<Vec<u8>> {
    [BRANCHES, COMMITS, TREES, WORKSPACE]
        .iter()
        .map(|ns| format!("{ns}{repo}/").into_bytes())
        .collect()
}
