use crate::{
    bigquery::{
        client::ClientInner,
        convert,
        models::{JobReference, TableRow},
    },
    error::WarehouseError,
    warehouse::RowStream,
};
use async_trait::async_trait;
use model::records::{
    row::RowData,
    schema::{Field, Schema},
};
use std::{collections::VecDeque, sync::Arc};

/// Walks the result pages of a finished query job.
pub struct BigQueryRowStream {
    client: Arc<ClientInner>,
    table: String,
    job: JobReference,
    schema: Schema,
    buffer: VecDeque<TableRow>,
    page_token: Option<String>,
}

impl BigQueryRowStream {
    pub(crate) fn new(
        client: Arc<ClientInner>,
        table: &str,
        job: JobReference,
        schema: Schema,
        rows: Vec<TableRow>,
        page_token: Option<String>,
    ) -> Self {
        Self {
            client,
            table: table.to_string(),
            job,
            schema,
            buffer: rows.into(),
            page_token,
        }
    }
}

#[async_trait]
impl RowStream for BigQueryRowStream {
    fn schema(&self) -> &[Field] {
        &self.schema
    }

    async fn next_row(&mut self) -> Result<Option<RowData>, WarehouseError> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return convert::row_from(&self.table, &self.schema, &row).map(Some);
            }

            let Some(token) = self.page_token.take().filter(|t| !t.is_empty()) else {
                return Ok(None);
            };

            let page = self
                .client
                .get_query_results(&self.job, Some(&token))
                .await?;
            self.buffer.extend(page.rows);
            self.page_token = page.page_token;
        }
    }
}
