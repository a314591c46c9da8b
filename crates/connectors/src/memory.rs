//! In-process warehouse that evaluates page queries against stored rows.
//!
//! Used by the engine tests: rows are ordered, filtered and sliced the way
//! the warehouse would, and every rendered query is recorded.

use crate::{
    error::WarehouseError,
    warehouse::{RowStream, Warehouse},
};
use async_trait::async_trait;
use model::{
    core::value::{FieldValue, Value},
    records::{
        row::RowData,
        schema::{Field, Schema},
    },
};
use planner::query::{
    ast::{
        common::OrderDir,
        expr::{BinaryOperator, Expr},
        select::Select,
    },
    dialect::BigQuery,
    renderer::to_sql,
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, MemoryTable>,
    queries: Vec<String>,
    failures: HashMap<String, String>,
    query_delay: Option<Duration>,
    list_error: Option<String>,
    closes: usize,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn create_table(&self, name: &str, schema: Schema) {
        self.state().tables.insert(
            name.to_string(),
            MemoryTable {
                schema,
                rows: Vec::new(),
            },
        );
    }

    /// Appends rows; each row lists its values in schema order.
    pub fn insert(&self, name: &str, rows: Vec<Vec<Value>>) {
        if let Some(table) = self.state().tables.get_mut(name) {
            table.rows.extend(rows);
        }
    }

    pub fn drop_table(&self, name: &str) {
        self.state().tables.remove(name);
    }

    /// Every query against `table` fails with an API error carrying `message`.
    pub fn fail_queries_on(&self, table: &str, message: &str) {
        self.state()
            .failures
            .insert(table.to_string(), message.to_string());
    }

    pub fn fail_listing(&self, message: &str) {
        self.state().list_error = Some(message.to_string());
    }

    /// Every query sleeps this long before answering.
    pub fn set_query_delay(&self, delay: Duration) {
        self.state().query_delay = Some(delay);
    }

    /// SQL of every query received so far, in arrival order.
    pub fn queries(&self) -> Vec<String> {
        self.state().queries.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    fn run(&self, query: &Select) -> Result<MemoryRowStream, WarehouseError> {
        let mut state = self.state();
        if state.closed {
            return Err(WarehouseError::Closed);
        }

        let table_name = query.from.name.clone();
        if let Some(message) = state.failures.get(&table_name) {
            return Err(WarehouseError::Api {
                status: 500,
                reason: Some("backendError".into()),
                message: message.clone(),
            });
        }

        let Some(table) = state.tables.get(&table_name) else {
            return Err(WarehouseError::NotFound(format!(
                "Table {}:{}.{} was not found",
                query.from.project, query.from.dataset, table_name
            )));
        };

        let schema = table.schema.clone();
        let mut rows: Vec<Vec<Value>> = table
            .rows
            .iter()
            .filter(|row| match &query.where_clause {
                Some(expr) => eval_predicate(expr, &schema, row),
                None => true,
            })
            .cloned()
            .collect();

        for order in query.order_by.iter().rev() {
            rows.sort_by(|a, b| {
                let left = operand(&order.expr, &schema, a);
                let right = operand(&order.expr, &schema, b);
                match order.direction {
                    Some(OrderDir::Desc) => sort_key(&right, &left),
                    _ => sort_key(&left, &right),
                }
            });
        }

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let rows = rows.into_iter().skip(offset).take(limit).collect();

        Ok(MemoryRowStream {
            table: table_name,
            schema,
            rows,
        })
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn query(&self, query: &Select) -> Result<Box<dyn RowStream>, WarehouseError> {
        let delay = {
            let mut state = self.state();
            state.queries.push(to_sql(query, &BigQuery));
            state.query_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(Box::new(self.run(query)?))
    }

    async fn list_tables(&self, _dataset: &str) -> Result<Vec<String>, WarehouseError> {
        let state = self.state();
        if let Some(message) = &state.list_error {
            return Err(WarehouseError::Api {
                status: 403,
                reason: Some("accessDenied".into()),
                message: message.clone(),
            });
        }
        Ok(state.tables.keys().cloned().collect())
    }

    async fn close(&self) -> Result<(), WarehouseError> {
        let mut state = self.state();
        state.closes += 1;
        state.closed = true;
        Ok(())
    }
}

pub struct MemoryRowStream {
    table: String,
    schema: Schema,
    rows: VecDeque<Vec<Value>>,
}

#[async_trait]
impl RowStream for MemoryRowStream {
    fn schema(&self) -> &[Field] {
        &self.schema
    }

    async fn next_row(&mut self) -> Result<Option<RowData>, WarehouseError> {
        let Some(values) = self.rows.pop_front() else {
            return Ok(None);
        };

        let field_values = self
            .schema
            .iter()
            .zip(values)
            .map(|(field, value)| FieldValue {
                name: field.name.clone(),
                value,
                data_type: field.data_type.clone(),
            })
            .collect();
        Ok(Some(RowData::new(&self.table, field_values)))
    }
}

/// NULLs sort first, like ascending order in the warehouse.
fn sort_key(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

fn operand(expr: &Expr, schema: &Schema, row: &[Value]) -> Value {
    match expr {
        Expr::Identifier(ident) => schema
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(&ident.name))
            .and_then(|i| row.get(i).cloned())
            .unwrap_or(Value::Null),
        Expr::Value(v) => v.clone(),
        Expr::BinaryOp(_) => Value::Boolean(eval_predicate(expr, schema, row)),
    }
}

fn eval_predicate(expr: &Expr, schema: &Schema, row: &[Value]) -> bool {
    let Expr::BinaryOp(op) = expr else {
        return matches!(operand(expr, schema, row), Value::Boolean(true));
    };

    match op.op {
        BinaryOperator::And => {
            eval_predicate(&op.left, schema, row) && eval_predicate(&op.right, schema, row)
        }
        BinaryOperator::Or => {
            eval_predicate(&op.left, schema, row) || eval_predicate(&op.right, schema, row)
        }
        _ => {
            let left = operand(&op.left, schema, row);
            let right = operand(&op.right, schema, row);
            // comparisons against NULL are never true
            let Some(ord) = left.compare(&right).filter(|_| !left.is_null() && !right.is_null())
            else {
                return false;
            };
            match op.op {
                BinaryOperator::Eq => ord == Ordering::Equal,
                BinaryOperator::Gt => ord == Ordering::Greater,
                BinaryOperator::GtEq => ord != Ordering::Less,
                BinaryOperator::Lt => ord == Ordering::Less,
                BinaryOperator::And | BinaryOperator::Or => false,
            }
        }
    }
}
