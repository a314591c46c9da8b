use connectors::error::WarehouseError;
use engine_config::error::ConfigError;
use engine_core::error::StateError;
use engine_runtime::error::{ReadError, SyncError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the settings file: {0}")]
    ConfigFileRead(#[from] std::io::Error),

    #[error("Failed to parse the settings file as JSON: {0}")]
    ConfigDeserialize(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Read failed: {0}")]
    Read(#[from] ReadError),

    #[error("Position store error: {0}")]
    State(#[from] StateError),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
