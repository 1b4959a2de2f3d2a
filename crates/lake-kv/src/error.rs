/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// A key read by the transaction changed before it committed.
    #[error("transaction conflict on key {key}")]
    Conflict { key: String },

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a persistent backend. The in-memory store never
    /// produces it; external `KvStore` implementations convert with `?`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend's internal state is unusable (e.g. a poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl KvError {
    /// Build a conflict error for a raw key, rendered lossily for messages.
    pub fn conflict(key: &[u8]) -> Self {
        Self::Conflict {
            key: String::from_utf8_lossy(key).into_owned(),
        }
    }

    /// Returns `true` for optimistic-concurrency failures worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type KvResult<T> = Result<T, KvError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn open_segment(path: &str) -> KvResult<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    #[test]
    fn backend_io_errors_convert() {
        let err = open_segment("/nonexistent/lake/segment").unwrap_err();
        assert!(matches!(err, KvError::Io(_)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn conflict_renders_key() {
        let err = KvError::conflict(b"branches/r/main");
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "transaction conflict on key branches/r/main");
    }
}
