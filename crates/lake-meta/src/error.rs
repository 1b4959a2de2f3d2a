use std::time::Duration;

use lake_kv::KvError;

/// Errors from metadata operations and the refresher lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("store error: {0}")]
    Store(#[from] KvError),

    #[error("metadata key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid refresher config: {0}")]
    InvalidConfig(String),

    #[error("refresher already started")]
    AlreadyStarted,

    #[error("refresher not running")]
    NotRunning,

    /// `start` was called outside a tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,

    #[error("refresher did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    /// The refresher task panicked or was cancelled.
    #[error("refresher task failed: {0}")]
    Task(String),
}

pub type MetaResult<T> = Result<T, MetaError>;
