//! Per-table read loop.

use crate::{
    error::ReaderError,
    reader::components::{
        emitter::{Delivery, RecordEmitter},
        record,
    },
};
use connectors::warehouse::Warehouse;
use engine_core::{
    error::SourceError,
    metrics::Metrics,
    source::page::PageSource,
    state::{cursor_store::CursorStore, position::PositionCodec},
};
use model::{
    execution::table::{SyncMode, TableDescriptor},
    pagination::cursor::Cursor,
    records::record::ChangeRecord,
};
use planner::query::{ast::common::TableRef, offsets::strategy_for};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub mod components;

/// Work for one table in one cycle, handed to the reader by value.
#[derive(Debug, Clone)]
pub struct ReadInput {
    pub table: TableDescriptor,
    /// Cursor recorded for the table when the cycle began.
    pub start: Option<Cursor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Read to the end of the table for this cycle.
    Completed { rows: u64 },
    /// The table no longer exists.
    Skipped,
    /// Teardown interrupted the read.
    Stopped { rows: u64 },
}

/// Reads tables page by page into the shared record channel.
///
/// Cheap to clone; one clone runs per table per cycle.
#[derive(Clone)]
pub struct TableReader {
    warehouse: Arc<dyn Warehouse>,
    emitter: RecordEmitter,
    metrics: Metrics,
    project: String,
    dataset: String,
    page_size: u64,
}

impl TableReader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        cursors: Arc<CursorStore>,
        codec: PositionCodec,
        records_tx: mpsc::Sender<ChangeRecord>,
        metrics: Metrics,
        project: &str,
        dataset: &str,
        page_size: u64,
    ) -> Self {
        Self {
            warehouse,
            emitter: RecordEmitter::new(records_tx, cursors, codec),
            metrics,
            project: project.to_string(),
            dataset: dataset.to_string(),
            page_size,
        }
    }

    pub fn cursors(&self) -> &Arc<CursorStore> {
        self.emitter.cursors()
    }

    pub async fn read(
        &self,
        input: ReadInput,
        cancel: &CancellationToken,
    ) -> Result<ReadOutcome, ReaderError> {
        let ReadInput { table, start } = input;
        let mode = table.mode(start.as_ref());
        let mut cursor = match mode {
            SyncMode::Snapshot => None,
            SyncMode::Incremental => start,
        };
        let strategy = strategy_for(&table);
        let mut rows = 0u64;

        info!(
            table = %table.name,
            mode = %mode,
            cursor = ?cursor,
            strategy = strategy.name(),
            "Reading table"
        );

        loop {
            if cancel.is_cancelled() {
                return Ok(self.stopped(&table, rows));
            }

            let page_start = cursor.clone();
            let table_ref = TableRef::new(&self.project, &self.dataset, &table.name);
            let opened = PageSource::open(
                self.warehouse.as_ref(),
                strategy.as_ref(),
                table_ref,
                cursor.as_ref(),
                self.page_size,
                cancel,
            )
            .await;

            let mut page = match opened {
                Ok(Some(page)) => page,
                Ok(None) => {
                    self.metrics.increment_skipped(1);
                    debug!(table = %table.name, rows, "Table skipped");
                    return Ok(ReadOutcome::Skipped);
                }
                Err(SourceError::Cancelled) => return Ok(self.stopped(&table, rows)),
                Err(SourceError::Warehouse(source)) => {
                    return Err(ReaderError::Fetch {
                        table: table.name.clone(),
                        source,
                    });
                }
            };
            self.metrics.increment_pages(1);

            loop {
                if cancel.is_cancelled() {
                    return Ok(self.stopped(&table, rows));
                }

                let row = match page.next_row(cancel).await {
                    Ok(Some(row)) => row,
                    Ok(None) => break,
                    Err(SourceError::Cancelled) => return Ok(self.stopped(&table, rows)),
                    Err(SourceError::Warehouse(source)) => {
                        return Err(ReaderError::Fetch {
                            table: table.name.clone(),
                            source,
                        });
                    }
                };

                let next = strategy.next_cursor(&row, cursor.as_ref());
                let position = self.emitter.position_for(&table.name, next.as_ref());
                let change = record::build(&row, table.primary_key.as_deref(), position);

                if self.emitter.deliver(change, cancel).await == Delivery::Stopped {
                    return Ok(self.stopped(&table, rows));
                }

                self.emitter.commit(&table.name, next.clone());
                if next.is_some() {
                    cursor = next;
                }
                rows += 1;
                self.metrics.increment_records(1);
            }

            trace!(
                table = %table.name,
                page_rows = page.consumed(),
                cursor = ?cursor,
                "Page done"
            );

            if page.is_short() {
                break;
            }

            // A full page of NULL increment values leaves the cursor where it was,
            // and the same query would return the same page again.
            if cursor == page_start {
                warn!(
                    table = %table.name,
                    rows,
                    "Full page did not advance the cursor, ending table for this cycle"
                );
                break;
            }
        }

        info!(table = %table.name, rows, "Table read complete");
        Ok(ReadOutcome::Completed { rows })
    }

    fn stopped(&self, table: &TableDescriptor, rows: u64) -> ReadOutcome {
        debug!(table = %table.name, rows, "Read stopped by teardown");
        ReadOutcome::Stopped { rows }
    }
}
