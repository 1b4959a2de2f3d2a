//! Error types for the index crate.

use lake_kv::KvError;
use lake_types::TypeError;

/// Errors returned by every index operation.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A path, commit, branch, or repository does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// A concurrent update won the race for the branch pointer.
    #[error("conflicting concurrent update: {0}")]
    Conflict(String),

    /// Malformed input, duplicate names, or an unreachable revert target.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying store failed for reasons unrelated to concurrency.
    #[error("store error: {0}")]
    Store(KvError),
}

impl IndexError {
    pub(crate) fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub(crate) fn encoding(e: impl std::fmt::Display) -> Self {
        Self::Store(KvError::Serialization(e.to_string()))
    }
}

impl From<KvError> for IndexError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::Conflict { key } => Self::Conflict(key),
            other => Self::Store(other),
        }
    }
}

impl From<TypeError> for IndexError {
    fn from(err: TypeError) -> Self {
        Self::encoding(err)
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
