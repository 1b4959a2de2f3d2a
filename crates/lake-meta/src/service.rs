//! Where installation metadata lives.

use std::collections::BTreeMap;
use std::sync::Arc;

use lake_kv::KvStore;

use crate::error::{MetaError, MetaResult};

/// Key prefix of metadata records in a [`KvStore`].
const META_PREFIX: &str = "meta/";

/// A backend that can describe itself.
pub trait MetadataSource {
    fn metadata(&self) -> MetaResult<BTreeMap<String, String>>;
}

/// Persistent key/value storage for installation metadata.
pub trait MetadataService: Send + Sync {
    fn set_metadata_key(&self, key: &str, value: &str) -> MetaResult<()>;

    /// Fails with [`MetaError::NotFound`] for unknown keys.
    fn get_metadata_key(&self, key: &str) -> MetaResult<String>;

    /// The backing store's own description, if this service has one.
    fn store_metadata(&self) -> Option<&dyn MetadataSource> {
        None
    }
}

/// Metadata kept in the same key-value store as the index.
pub struct KvMetadataService {
    store: Arc<dyn KvStore>,
}

impl KvMetadataService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Every metadata record, ordered by key.
    pub fn all(&self) -> MetaResult<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for (key, raw) in self.store.scan_prefix(META_PREFIX.as_bytes())? {
            let name = String::from_utf8_lossy(&key[META_PREFIX.len()..]).into_owned();
            out.insert(name, decode(&raw)?);
        }
        Ok(out)
    }

    fn key(name: &str) -> Vec<u8> {
        format!("{META_PREFIX}{name}").into_bytes()
    }
}

impl std::fmt::Debug for KvMetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvMetadataService").finish_non_exhaustive()
    }
}

impl MetadataService for KvMetadataService {
    fn set_metadata_key(&self, key: &str, value: &str) -> MetaResult<()> {
        let raw = serde_json::to_vec(value).map_err(|e| MetaError::Serialization(e.to_string()))?;
        self.store.set(&Self::key(key), raw)?;
        Ok(())
    }

    fn get_metadata_key(&self, key: &str) -> MetaResult<String> {
        match self.store.get(&Self::key(key))? {
            Some(raw) => decode(&raw),
            None => Err(MetaError::NotFound(key.to_string())),
        }
    }

    fn store_metadata(&self) -> Option<&dyn MetadataSource> {
        Some(self)
    }
}

impl MetadataSource for KvMetadataService {
    fn metadata(&self) -> MetaResult<BTreeMap<String, String>> {
        Ok(self.store.describe())
    }
}

fn decode(raw: &[u8]) -> MetaResult<String> {
    serde_json::from_slice(raw).map_err(|e| MetaError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lake_kv::InMemoryKvStore;

    fn service() -> KvMetadataService {
        KvMetadataService::new(Arc::new(InMemoryKvStore::new()))
    }

    #[test]
    fn set_and_get() {
        let svc = service();
        svc.set_metadata_key("os", "linux").unwrap();
        assert_eq!(svc.get_metadata_key("os").unwrap(), "linux");
        svc.set_metadata_key("os", "macos").unwrap();
        assert_eq!(svc.get_metadata_key("os").unwrap(), "macos");
    }

    #[test]
    fn missing_key_is_not_found() {
        let err = service().get_metadata_key("nope").unwrap_err();
        assert!(matches!(err, MetaError::NotFound(k) if k == "nope"));
    }

    #[test]
    fn all_lists_only_metadata() {
        let store = Arc::new(InMemoryKvStore::new());
        store.set(b"repos/x", b"{}".to_vec()).unwrap();
        let svc = KvMetadataService::new(store);
        svc.set_metadata_key("b", "2").unwrap();
        svc.set_metadata_key("a", "1").unwrap();
        let all = svc.all().unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn exposes_store_description() {
        let svc = service();
        let meta = svc.store_metadata().unwrap().metadata().unwrap();
        assert_eq!(meta.get("kv_type").map(String::as_str), Some("memory"));
    }
}
