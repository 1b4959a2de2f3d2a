//! Typed reads and writes of records and immutable objects inside a
//! transaction.
//!
//! Trees and commits are write-once: writing an address that is already
//! present is a no-op, and nothing here ever overwrites one.

use serde::de::DeserializeOwned;
use serde::Serialize;

use lake_kv::KvTxn;
use lake_types::{Address, ContentHash};

use crate::error::{IndexError, IndexResult};
use crate::keys;
use crate::model::{Commit, Tree};

/// Decode a JSON record, if present.
pub(crate) fn get_json<T: DeserializeOwned>(
    tx: &mut dyn KvTxn,
    key: &[u8],
) -> IndexResult<Option<T>> {
    match tx.get(key)? {
        Some(raw) => serde_json::from_slice(&raw)
            .map(Some)
            .map_err(IndexError::encoding),
        None => Ok(None),
    }
}

/// Encode and store a JSON record.
pub(crate) fn put_json<T: Serialize + ?Sized>(
    tx: &mut dyn KvTxn,
    key: &[u8],
    value: &T,
) -> IndexResult<()> {
    let raw = serde_json::to_vec(value).map_err(IndexError::encoding)?;
    tx.set(key, raw)?;
    Ok(())
}

/// Decode every record under a prefix, keeping keys.
pub(crate) fn scan_json<T: DeserializeOwned>(
    tx: &mut dyn KvTxn,
    prefix: &[u8],
) -> IndexResult<Vec<(Vec<u8>, T)>> {
    tx.scan_prefix(prefix)?
        .into_iter()
        .map(|(key, raw)| {
            serde_json::from_slice(&raw)
                .map(|value| (key, value))
                .map_err(IndexError::encoding)
        })
        .collect()
}

pub(crate) fn read_tree(tx: &mut dyn KvTxn, repo: &str, address: &Address) -> IndexResult<Tree> {
    get_json(tx, &keys::tree(repo, address))?
        .ok_or_else(|| IndexError::not_found("tree", address.to_hex()))
}

/// Persist a tree and return its address.
pub(crate) fn write_tree(
    tx: &mut dyn KvTxn,
    hasher: &dyn ContentHash,
    repo: &str,
    tree: &Tree,
) -> IndexResult<Address> {
    let address = tree.address(hasher)?;
    let key = keys::tree(repo, &address);
    if tx.get(&key)?.is_none() {
        put_json(tx, &key, tree)?;
    }
    Ok(address)
}

pub(crate) fn read_commit(
    tx: &mut dyn KvTxn,
    repo: &str,
    address: &Address,
) -> IndexResult<Commit> {
    get_json(tx, &keys::commit(repo, address))?
        .ok_or_else(|| IndexError::not_found("commit", address.to_hex()))
}

pub(crate) fn write_commit(tx: &mut dyn KvTxn, repo: &str, commit: &Commit) -> IndexResult<()> {
    let key = keys::commit(repo, &commit.address);
    if tx.get(&key)?.is_none() {
        put_json(tx, &key, commit)?;
    }
    Ok(())
}
