use crate::error::WarehouseError;
use async_trait::async_trait;
use model::records::{row::RowData, schema::Field};
use planner::query::ast::select::Select;

/// A queryable analytical warehouse.
///
/// One client is shared by every table reader of a source, so implementations
/// must be safe to call concurrently.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs `query` and returns a cursor over its result rows.
    ///
    /// A missing table surfaces as an error for which
    /// [`WarehouseError::is_not_found`] is true.
    async fn query(&self, query: &Select) -> Result<Box<dyn RowStream>, WarehouseError>;

    /// Names of all tables in `dataset`.
    async fn list_tables(&self, dataset: &str) -> Result<Vec<String>, WarehouseError>;

    /// Releases the client. Calling it more than once is harmless.
    async fn close(&self) -> Result<(), WarehouseError>;
}

/// Rows of one executed query, in result order.
#[async_trait]
pub trait RowStream: Send {
    fn schema(&self) -> &[Field];

    /// Next row, or `None` once the result set is exhausted.
    async fn next_row(&mut self) -> Result<Option<RowData>, WarehouseError>;
}
