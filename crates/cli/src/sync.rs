//! The `sync` host loop: read, print, persist, ack.

use crate::{error::CliError, output::RecordWriter};
use engine_core::state::PositionStore;
use engine_runtime::{
    error::ReadError,
    source::{SourceConnector, WarehouseSource},
};
use std::{collections::HashMap, io::Write, path::Path, time::Duration};
use tokio_util::sync::CancellationToken;
use model::pagination::position::Position;
use tracing::{debug, info, warn};

/// Pause between polls while the source has nothing buffered.
const BACKOFF: Duration = Duration::from_millis(200);

/// Flat settings map as handed to `configure`.
pub async fn read_settings(path: &Path) -> Result<HashMap<String, String>, CliError> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Drives an opened source until cancellation or a terminal read error,
/// then tears it down.
pub async fn run<W: Write>(
    source: &mut WarehouseSource,
    store: &dyn PositionStore,
    source_id: &str,
    writer: &mut RecordWriter<W>,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let result = pump(source, store, source_id, writer, cancel).await;
    source.teardown().await?;
    info!(records = writer.written(), "Sync stopped");
    result
}

async fn pump<W: Write>(
    source: &mut WarehouseSource,
    store: &dyn PositionStore,
    source_id: &str,
    writer: &mut RecordWriter<W>,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    while !cancel.is_cancelled() {
        match source.read() {
            Ok(record) => {
                writer.write(&record)?;
                checkpoint(store, source_id, &record.position).await?;
                source.ack(&record.position).await?;
            }
            Err(ReadError::BackoffRetry) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(BACKOFF) => {}
                }
            }
            Err(ReadError::Stopped) => {
                debug!("Source stopped");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Persists `position` unless it is empty. An empty token comes from a failed
/// encode and must not replace the last good one. Returns whether it was saved.
async fn checkpoint(
    store: &dyn PositionStore,
    source_id: &str,
    position: &Position,
) -> Result<bool, CliError> {
    if position.is_empty() {
        warn!(source = source_id, "Record has no position, keeping the stored one");
        return Ok(false);
    }
    store.save(source_id, position).await?;
    Ok(true)
}
