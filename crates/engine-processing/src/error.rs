use connectors::error::WarehouseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Failed to read table '{table}': {source}")]
    Fetch {
        table: String,
        #[source]
        source: WarehouseError,
    },
}
