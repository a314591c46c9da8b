use connectors::error::WarehouseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to encode position: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Position store error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Failed to (de)serialize stored position: {0}")]
    Serialization(#[from] bincode::Error),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// The run was torn down while a query or page fetch was in flight.
    #[error("Page fetch cancelled")]
    Cancelled,
}
