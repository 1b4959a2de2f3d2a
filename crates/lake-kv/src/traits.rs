use std::collections::BTreeMap;

use crate::error::{KvError, KvResult};

/// A key and its value, as returned by prefix scans.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// A view over the store inside one atomic transaction.
///
/// All implementations must satisfy these invariants:
/// - Reads observe the transaction's own uncommitted writes.
/// - `scan_prefix` returns pairs in ascending key order.
/// - `commit` is all-or-nothing and fails with [`KvError::Conflict`] if any
///   key read (or any prefix scanned) changed concurrently.
pub trait KvTxn {
    /// Read a key. Returns `Ok(None)` if it does not exist.
    fn get(&mut self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;

    /// Create or overwrite a key.
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> KvResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> KvResult<()>;

    /// All pairs whose key starts with `prefix`, ordered by key.
    fn scan_prefix(&mut self, prefix: &[u8]) -> KvResult<Vec<KvPair>>;

    /// Check that nothing read or scanned so far has changed, without
    /// applying any writes. Fails with [`KvError::Conflict`] like `commit`.
    fn validate(&self) -> KvResult<()>;

    /// Apply every buffered write atomically.
    fn commit(self: Box<Self>) -> KvResult<()>;
}

/// Transactional byte-oriented key-value store.
///
/// The store is shared process-wide and must not assume a single writer.
/// The single-key helpers each run in their own transaction.
pub trait KvStore: Send + Sync {
    /// Open a new transaction.
    fn begin(&self) -> KvResult<Box<dyn KvTxn + '_>>;

    /// Backend-specific descriptive metadata (type, sizes, ...).
    ///
    /// Default implementation reports nothing.
    fn describe(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        transact(self, |tx| tx.get(key))
    }

    fn set(&self, key: &[u8], value: Vec<u8>) -> KvResult<()> {
        transact(self, |tx| tx.set(key, value))
    }

    fn delete(&self, key: &[u8]) -> KvResult<()> {
        transact(self, |tx| tx.delete(key))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> KvResult<Vec<KvPair>> {
        transact(self, |tx| tx.scan_prefix(prefix))
    }
}

/// Run `f` inside a fresh transaction and commit it.
///
/// If `f` fails the transaction is dropped without committing, so none of
/// its writes become visible. A failure computed from reads that have since
/// changed is reported as [`KvError::Conflict`] instead of `f`'s error.
pub fn transact<S, T, E, F>(store: &S, f: F) -> Result<T, E>
where
    S: KvStore + ?Sized,
    E: From<KvError>,
    F: FnOnce(&mut dyn KvTxn) -> Result<T, E>,
{
    let mut txn = store.begin()?;
    match f(txn.as_mut()) {
        Ok(out) => {
            txn.commit()?;
            Ok(out)
        }
        Err(e) => {
            txn.validate()?;
            Err(e)
        }
    }
}
