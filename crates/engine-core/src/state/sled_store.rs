use crate::{error::StateError, state::PositionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::pagination::position::Position;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct StoredPosition {
    position: Vec<u8>,
    updated_at: DateTime<Utc>,
}

pub struct SledPositionStore {
    db: sled::Db,
}

impl SledPositionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn key(source_id: &str) -> String {
        format!("pos:{source_id}")
    }
}

#[async_trait]
impl PositionStore for SledPositionStore {
    async fn save(&self, source_id: &str, position: &Position) -> Result<(), StateError> {
        let entry = StoredPosition {
            position: position.as_bytes().to_vec(),
            updated_at: Utc::now(),
        };
        self.db
            .insert(Self::key(source_id), bincode::serialize(&entry)?)?;
        self.db.flush_async().await?;
        debug!(source_id, bytes = position.as_bytes().len(), "Saved position");
        Ok(())
    }

    async fn load(&self, source_id: &str) -> Result<Option<Position>, StateError> {
        match self.db.get(Self::key(source_id))? {
            Some(bytes) => {
                let entry: StoredPosition = bincode::deserialize(&bytes)?;
                Ok(Some(Position::from(entry.position)))
            }
            None => Ok(None),
        }
    }
}
