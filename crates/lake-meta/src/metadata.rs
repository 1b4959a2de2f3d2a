//! Installation metadata values.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::MetaResult;
use crate::service::MetadataService;

pub const LAKE_VERSION: &str = "lake_version";
pub const ARCHITECTURE: &str = "architecture";
pub const OS: &str = "os";
pub const SETUP_TIME: &str = "setup_time";
pub const INSTALLATION_ID: &str = "installation_id";

/// Recompute and persist the runtime metadata values, including the
/// store's description when the service offers one.
pub fn update_metadata_values(
    service: &dyn MetadataService,
) -> MetaResult<BTreeMap<String, String>> {
    write_values(service, true)
}

/// Record the setup time and a fresh installation id, then the runtime
/// values. Returns the installation id and the runtime values.
pub fn write_initial_metadata(
    service: &dyn MetadataService,
) -> MetaResult<(String, BTreeMap<String, String>)> {
    let setup_time = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    service.set_metadata_key(SETUP_TIME, &setup_time)?;

    let installation_id = Uuid::now_v7().to_string();
    service.set_metadata_key(INSTALLATION_ID, &installation_id)?;

    let values = update_metadata_values(service)?;
    Ok((installation_id, values))
}

pub(crate) fn write_values(
    service: &dyn MetadataService,
    include_store: bool,
) -> MetaResult<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    values.insert(LAKE_VERSION.to_string(), env!("CARGO_PKG_VERSION").to_string());
    values.insert(ARCHITECTURE.to_string(), std::env::consts::ARCH.to_string());
    values.insert(OS.to_string(), std::env::consts::OS.to_string());

    if include_store {
        if let Some(source) = service.store_metadata() {
            // A store that cannot describe itself still gets the rest.
            match source.metadata() {
                Ok(store_values) => values.extend(store_values),
                Err(e) => debug!(error = %e, "skipping store metadata"),
            }
        }
    }

    for (key, value) in &values {
        service.set_metadata_key(key, value)?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::DateTime;
    use lake_kv::InMemoryKvStore;

    use crate::error::MetaError;
    use crate::service::KvMetadataService;

    /// A service without store metadata that can be told to fail writes.
    #[derive(Default)]
    struct MapService {
        values: Mutex<BTreeMap<String, String>>,
        fail_writes: bool,
    }

    impl MetadataService for MapService {
        fn set_metadata_key(&self, key: &str, value: &str) -> MetaResult<()> {
            if self.fail_writes {
                return Err(MetaError::Serialization("read-only".into()));
            }
            self.values.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }

        fn get_metadata_key(&self, key: &str) -> MetaResult<String> {
            self.values
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| MetaError::NotFound(key.into()))
        }
    }

    #[test]
    fn update_includes_runtime_and_store_values() {
        let svc = KvMetadataService::new(Arc::new(InMemoryKvStore::new()));
        let values = update_metadata_values(&svc).unwrap();
        assert_eq!(values[LAKE_VERSION], env!("CARGO_PKG_VERSION"));
        assert_eq!(values[OS], std::env::consts::OS);
        assert_eq!(values["kv_type"], "memory");
        assert_eq!(svc.get_metadata_key(ARCHITECTURE).unwrap(), std::env::consts::ARCH);
    }

    #[test]
    fn update_without_store_capability() {
        let svc = MapService::default();
        let values = update_metadata_values(&svc).unwrap();
        assert!(!values.contains_key("kv_type"));
        assert_eq!(svc.values.lock().unwrap().len(), values.len());
    }

    #[test]
    fn store_values_can_be_excluded() {
        let svc = KvMetadataService::new(Arc::new(InMemoryKvStore::new()));
        let values = write_values(&svc, false).unwrap();
        assert!(!values.contains_key("kv_type"));
    }

    #[test]
    fn initial_metadata_records_setup() {
        let svc = MapService::default();
        let (id, values) = write_initial_metadata(&svc).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(svc.get_metadata_key(INSTALLATION_ID).unwrap(), id);
        let setup = svc.get_metadata_key(SETUP_TIME).unwrap();
        assert!(DateTime::parse_from_rfc3339(&setup).is_ok());
        assert!(values.contains_key(LAKE_VERSION));
    }

    #[test]
    fn write_failure_propagates() {
        let svc = MapService {
            fail_writes: true,
            ..MapService::default()
        };
        assert!(update_metadata_values(&svc).is_err());
        assert!(write_initial_metadata(&svc).is_err());
    }
}
