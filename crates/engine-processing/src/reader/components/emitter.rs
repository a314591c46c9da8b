use engine_core::state::{cursor_store::CursorStore, position::PositionCodec};
use model::{
    pagination::{cursor::Cursor, position::Position},
    records::record::ChangeRecord,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Outcome of handing one record to the output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    /// Teardown began, or the channel is gone.
    Stopped,
}

/// Hands records to the shared output channel and keeps the cursor store in
/// step with what has been accepted.
#[derive(Clone)]
pub struct RecordEmitter {
    records_tx: mpsc::Sender<ChangeRecord>,
    cursors: Arc<CursorStore>,
    codec: PositionCodec,
}

impl RecordEmitter {
    pub fn new(
        records_tx: mpsc::Sender<ChangeRecord>,
        cursors: Arc<CursorStore>,
        codec: PositionCodec,
    ) -> Self {
        Self {
            records_tx,
            cursors,
            codec,
        }
    }

    pub fn cursors(&self) -> &Arc<CursorStore> {
        &self.cursors
    }

    /// Position of the whole store once `table` has moved to `next`.
    ///
    /// An encoding failure yields an empty position; the row is still emitted.
    pub fn position_for(&self, table: &str, next: Option<&Cursor>) -> Position {
        let cursors = match next {
            Some(cursor) => self.cursors.snapshot_with(table, cursor),
            None => self.cursors.snapshot(),
        };

        match self.codec.encode(&cursors) {
            Ok(position) => position,
            Err(e) => {
                warn!(table, error = %e, "Failed to encode position, emitting record without one");
                Position::default()
            }
        }
    }

    /// Blocks until the channel takes `record` or the run is cancelled.
    pub async fn deliver(&self, record: ChangeRecord, cancel: &CancellationToken) -> Delivery {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Delivery::Stopped,
            sent = self.records_tx.send(record) => match sent {
                Ok(()) => Delivery::Accepted,
                Err(_) => {
                    trace!("Record channel closed");
                    Delivery::Stopped
                }
            },
        }
    }

    /// Records that the row which moved `table` to `next` was accepted.
    pub fn commit(&self, table: &str, next: Option<Cursor>) {
        if let Some(cursor) = next {
            self.cursors.set(table, cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn position_overlays_the_pending_cursor() {
        let (tx, _rx) = mpsc::channel(1);
        let cursors = Arc::new(CursorStore::from_map(BTreeMap::from([(
            "orders".to_string(),
            Cursor::offset(100),
        )])));
        let emitter = RecordEmitter::new(tx, Arc::clone(&cursors), PositionCodec::default());

        let position = emitter.position_for("users", Some(&Cursor::offset(1)));
        let decoded = PositionCodec::default().decode(&position);
        assert_eq!(decoded.get("orders"), Some(&Cursor::offset(100)));
        assert_eq!(decoded.get("users"), Some(&Cursor::offset(1)));
        // nothing is stored until the record is accepted
        assert!(cursors.get("users").is_none());

        emitter.commit("users", Some(Cursor::offset(1)));
        assert_eq!(cursors.get("users"), Some(Cursor::offset(1)));
    }

    #[tokio::test]
    async fn closed_channel_or_cancel_stops_delivery() {
        let (tx, rx) = mpsc::channel(1);
        let emitter = RecordEmitter::new(tx, Arc::new(CursorStore::new()), PositionCodec::default());
        let record = ChangeRecord {
            table: "t".into(),
            created_at: chrono::Utc::now(),
            payload: Default::default(),
            key: None,
            position: Position::default(),
        };
        let cancel = CancellationToken::new();

        assert_eq!(emitter.deliver(record.clone(), &cancel).await, Delivery::Accepted);

        // channel full: only cancellation gets us out
        cancel.cancel();
        assert_eq!(emitter.deliver(record.clone(), &cancel).await, Delivery::Stopped);

        drop(rx);
        let fresh = CancellationToken::new();
        assert_eq!(emitter.deliver(record, &fresh).await, Delivery::Stopped);
    }
}
