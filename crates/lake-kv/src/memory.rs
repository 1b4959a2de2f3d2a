use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use crate::error::{KvError, KvResult};
use crate::traits::{KvPair, KvStore, KvTxn};

/// Version recorded for a key that was absent when read.
const ABSENT: u64 = 0;

#[derive(Clone, Debug)]
struct Slot {
    value: Vec<u8>,
    version: u64,
}

#[derive(Debug, Default)]
struct Inner {
    data: BTreeMap<Vec<u8>, Slot>,
    /// Monotonic commit counter; every committed write stamps its key with it.
    clock: u64,
}

impl Inner {
    fn version_of(&self, key: &[u8]) -> u64 {
        self.data.get(key).map_or(ABSENT, |slot| slot.version)
    }

    fn listing(&self, prefix: &[u8]) -> Vec<(Vec<u8>, u64)> {
        self.range(prefix)
            .map(|(k, slot)| (k.clone(), slot.version))
            .collect()
    }

    fn range<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = (&'a Vec<u8>, &'a Slot)> + 'a {
        self.data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
    }
}

/// In-memory, `BTreeMap`-based transactional store.
///
/// Intended for tests and embedding. Transactions are optimistic: they read
/// the live map, remember the version of every key they looked at, buffer
/// their writes, and validate those versions under the write lock at commit.
pub struct InMemoryKvStore {
    inner: RwLock<Inner>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.read_inner().map(|inner| inner.data.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_inner(&self) -> KvResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| KvError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_inner(&self) -> KvResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| KvError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .finish()
    }
}

impl KvStore for InMemoryKvStore {
    fn begin(&self) -> KvResult<Box<dyn KvTxn + '_>> {
        Ok(Box::new(MemoryTxn {
            store: self,
            reads: BTreeMap::new(),
            scans: Vec::new(),
            writes: BTreeMap::new(),
        }))
    }

    fn describe(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        meta.insert("kv_type".to_string(), "memory".to_string());
        if let Ok(inner) = self.read_inner() {
            meta.insert("kv_keys".to_string(), inner.data.len().to_string());
            let bytes: usize = inner
                .data
                .iter()
                .map(|(k, slot)| k.len() + slot.value.len())
                .sum();
            meta.insert("kv_bytes".to_string(), bytes.to_string());
        }
        meta
    }
}

/// An optimistic transaction over [`InMemoryKvStore`].
struct MemoryTxn<'a> {
    store: &'a InMemoryKvStore,
    /// First-observed version of every key read outside the write buffer.
    reads: BTreeMap<Vec<u8>, u64>,
    /// Prefix scans with the (key, version) listing they observed.
    scans: Vec<(Vec<u8>, Vec<(Vec<u8>, u64)>)>,
    /// Buffered writes; `None` is a delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl KvTxn for MemoryTxn<'_> {
    fn get(&mut self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }
        let inner = self.store.read_inner()?;
        let slot = inner.data.get(key);
        self.reads
            .entry(key.to_vec())
            .or_insert_with(|| slot.map_or(ABSENT, |s| s.version));
        Ok(slot.map(|s| s.value.clone()))
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> KvResult<()> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> KvResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn scan_prefix(&mut self, prefix: &[u8]) -> KvResult<Vec<KvPair>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = {
            let inner = self.store.read_inner()?;
            self.scans.push((prefix.to_vec(), inner.listing(prefix)));
            inner
                .range(prefix)
                .map(|(k, slot)| (k.clone(), slot.value.clone()))
                .collect()
        };
        for (key, write) in self
            .writes
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match write {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn validate(&self) -> KvResult<()> {
        let inner = self.store.read_inner()?;
        check_unchanged(&inner, &self.reads, &self.scans)
    }

    fn commit(self: Box<Self>) -> KvResult<()> {
        let MemoryTxn {
            store,
            reads,
            scans,
            writes,
        } = *self;
        let mut inner = store.write_inner()?;
        check_unchanged(&inner, &reads, &scans)?;

        if writes.is_empty() {
            return Ok(());
        }
        inner.clock += 1;
        let version = inner.clock;
        for (key, write) in writes {
            match write {
                Some(value) => {
                    inner.data.insert(key, Slot { value, version });
                }
                None => {
                    inner.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

fn check_unchanged(
    inner: &Inner,
    reads: &BTreeMap<Vec<u8>, u64>,
    scans: &[(Vec<u8>, Vec<(Vec<u8>, u64)>)],
) -> KvResult<()> {
    for (key, seen) in reads {
        if inner.version_of(key) != *seen {
            trace!(key = %String::from_utf8_lossy(key), "read set invalidated");
            return Err(KvError::conflict(key));
        }
    }
    for (prefix, seen) in scans {
        if inner.listing(prefix) != *seen {
            trace!(prefix = %String::from_utf8_lossy(prefix), "scan invalidated");
            return Err(KvError::conflict(prefix));
        }
    }
    Ok(())
}
