use crate::error::StateError;
use async_trait::async_trait;
use model::pagination::position::Position;

pub mod cursor_store;
pub mod position;
pub mod sled_store;

/// Durable home for the last acknowledged position of a source, kept by hosts.
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn save(&self, source_id: &str, position: &Position) -> Result<(), StateError>;
    async fn load(&self, source_id: &str) -> Result<Option<Position>, StateError>;
}
