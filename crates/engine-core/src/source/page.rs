//! One page query round trip against the warehouse.

use crate::error::SourceError;
use connectors::warehouse::{RowStream, Warehouse};
use model::{
    pagination::cursor::Cursor,
    records::{row::RowData, schema::Field},
};
use planner::query::{
    ast::common::TableRef,
    offsets::{OffsetStrategy, page_query},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Forward-only rows of a single page, plus their schema.
///
/// The page counts the rows handed out so the caller can tell a short page
/// (end of table for this cycle) from a full one.
pub struct PageSource {
    table: String,
    stream: Box<dyn RowStream>,
    page_size: u64,
    consumed: u64,
}

impl PageSource {
    /// Builds and runs the page query for `table` starting at `cursor`.
    ///
    /// Returns `Ok(None)` when the table no longer exists. Cancellation
    /// abandons the in-flight query.
    pub async fn open(
        warehouse: &dyn Warehouse,
        strategy: &dyn OffsetStrategy,
        table: TableRef,
        cursor: Option<&Cursor>,
        page_size: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<Self>, SourceError> {
        let name = table.name.clone();
        let query = page_query(strategy, table, cursor, page_size);
        debug!(
            table = %name,
            strategy = strategy.name(),
            cursor = ?cursor,
            "Querying page"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            result = warehouse.query(&query) => result,
        };

        match result {
            Ok(stream) => Ok(Some(Self {
                table: name,
                stream,
                page_size,
                consumed: 0,
            })),
            Err(e) if e.is_not_found() => {
                warn!(table = %name, error = %e, "Table not found, skipping it this cycle");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn schema(&self) -> &[Field] {
        self.stream.schema()
    }

    pub async fn next_row(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<RowData>, SourceError> {
        let row = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            row = self.stream.next_row() => row?,
        };

        if row.is_some() {
            self.consumed += 1;
        } else {
            trace!(table = %self.table, rows = self.consumed, "Page exhausted");
        }
        Ok(row)
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Fewer rows than the page size were read: nothing more this cycle.
    pub fn is_short(&self) -> bool {
        self.consumed < self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryWarehouse;
    use model::core::{data_type::DataType, value::Value};
    use planner::query::offsets::RowOffset;
    use std::time::Duration;

    fn warehouse(rows: i64) -> MemoryWarehouse {
        let wh = MemoryWarehouse::new();
        wh.create_table("orders", vec![Field::new("id", DataType::Integer)]);
        wh.insert(
            "orders",
            (1..=rows).map(|i| vec![Value::Int(i)]).collect(),
        );
        wh
    }

    async fn drain(page: &mut PageSource, cancel: &CancellationToken) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Some(row) = page.next_row(cancel).await.unwrap() {
            ids.push(row.get_value("id").as_i64().unwrap());
        }
        ids
    }

    #[tokio::test]
    async fn full_page_is_not_short_until_a_short_one_follows() {
        let wh = warehouse(4);
        let cancel = CancellationToken::new();
        let strategy = RowOffset { order_by: None };
        let table = TableRef::new("p", "d", "orders");

        let mut page = PageSource::open(&wh, &strategy, table.clone(), None, 2, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.schema().len(), 1);
        assert_eq!(drain(&mut page, &cancel).await, vec![1, 2]);
        assert!(!page.is_short());

        let cursor = Cursor::offset(4);
        let mut page = PageSource::open(&wh, &strategy, table, Some(&cursor), 2, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert!(drain(&mut page, &cancel).await.is_empty());
        assert_eq!(page.consumed(), 0);
        assert!(page.is_short());
    }

    #[tokio::test]
    async fn missing_table_is_soft() {
        let wh = warehouse(1);
        let cancel = CancellationToken::new();
        let strategy = RowOffset { order_by: None };
        let page = PageSource::open(
            &wh,
            &strategy,
            TableRef::new("p", "d", "gone"),
            None,
            10,
            &cancel,
        )
        .await
        .unwrap();
        assert!(page.is_none());
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let wh = warehouse(1);
        wh.fail_queries_on("orders", "backend exploded");
        let cancel = CancellationToken::new();
        let strategy = RowOffset { order_by: None };
        let result = PageSource::open(
            &wh,
            &strategy,
            TableRef::new("p", "d", "orders"),
            None,
            10,
            &cancel,
        )
        .await;
        assert!(matches!(result, Err(SourceError::Warehouse(_))));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_slow_query() {
        let wh = warehouse(1);
        wh.set_query_delay(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let strategy = RowOffset { order_by: None };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = PageSource::open(
            &wh,
            &strategy,
            TableRef::new("p", "d", "orders"),
            None,
            10,
            &cancel,
        )
        .await;
        assert!(matches!(result, Err(SourceError::Cancelled)));
    }
}
