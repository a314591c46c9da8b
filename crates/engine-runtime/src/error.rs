use connectors::error::WarehouseError;
use engine_config::error::ConfigError;
use engine_processing::error::ReaderError;
use std::sync::Arc;
use thiserror::Error;

/// Errors that end a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source was opened before it was configured.
    #[error("Source is not configured")]
    NotConfigured,

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Table discovery failed: {0}")]
    Discovery(#[source] WarehouseError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    /// A supervised task panicked or was aborted.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Benign terminal state set by teardown.
    #[error("Source is stopped")]
    Stopped,
}

/// Result of polling the source for the next record.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Nothing buffered right now; poll again later.
    #[error("No record available, retry later")]
    BackoffRetry,

    #[error("Source is stopped")]
    Stopped,

    #[error("Source is not open")]
    NotOpen,

    /// The run died; carries the first error that killed it.
    #[error("Sync terminated: {0}")]
    Terminated(Arc<SyncError>),
}
