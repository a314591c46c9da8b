use crate::query::{
    ast::{
        common::TableRef,
        expr::{BinaryOp, BinaryOperator, Expr},
        select::Select,
    },
    builder::SelectBuilder,
    ident, value,
};
use model::{
    execution::table::TableDescriptor, pagination::cursor::Cursor, records::row::RowData,
};
use std::sync::Arc;

/// Decides how a page query is shaped and how the cursor moves per row.
pub trait OffsetStrategy: Send + Sync {
    /// Applies the pagination logic (WHERE, ORDER BY, LIMIT, OFFSET) to a builder.
    fn apply_to_builder(
        &self,
        builder: SelectBuilder,
        cursor: Option<&Cursor>,
        limit: u64,
    ) -> SelectBuilder;

    /// Cursor after consuming `row`, given the cursor before it.
    fn next_cursor(&self, row: &RowData, current: Option<&Cursor>) -> Option<Cursor>;

    fn name(&self) -> &'static str;
}

/// No increment column: `LIMIT n OFFSET c`, optionally ordered by an explicit column.
///
/// Without an explicit ORDER BY the scan order is whatever the warehouse returns,
/// which is not guaranteed stable between pages under concurrent writes.
pub struct RowOffset {
    pub order_by: Option<String>,
}

/// Increment column: `WHERE col > last ORDER BY col LIMIT n`.
///
/// Rows sharing the boundary value of a page may be skipped on the next page.
pub struct IncrementOffset {
    pub col: String,
}

impl OffsetStrategy for RowOffset {
    fn apply_to_builder(
        &self,
        mut builder: SelectBuilder,
        cursor: Option<&Cursor>,
        limit: u64,
    ) -> SelectBuilder {
        let offset = match cursor {
            Some(Cursor::Offset { offset }) => *offset,
            _ => 0,
        };

        if let Some(col) = &self.order_by {
            builder = builder.order_by(ident(col), None);
        }

        builder.limit(limit).offset(offset)
    }

    fn next_cursor(&self, _row: &RowData, current: Option<&Cursor>) -> Option<Cursor> {
        let offset = match current {
            Some(Cursor::Offset { offset }) => *offset,
            _ => 0,
        };
        Some(Cursor::offset(offset + 1))
    }

    fn name(&self) -> &'static str {
        "row-offset"
    }
}

impl OffsetStrategy for IncrementOffset {
    fn apply_to_builder(
        &self,
        mut builder: SelectBuilder,
        cursor: Option<&Cursor>,
        limit: u64,
    ) -> SelectBuilder {
        // No cursor yet means the snapshot pass: no predicate.
        if let Some(Cursor::Column { value: last, .. }) = cursor {
            builder = builder.filter(Expr::BinaryOp(Box::new(BinaryOp {
                left: ident(&self.col),
                op: BinaryOperator::Gt,
                right: value(last.clone()),
            })));
        }

        builder.order_by(ident(&self.col), None).limit(limit)
    }

    fn next_cursor(&self, row: &RowData, current: Option<&Cursor>) -> Option<Cursor> {
        let v = row.get_value(&self.col);
        if v.is_null() {
            // NULLs sort first and cannot be compared against; keep the old position
            return current.cloned();
        }
        Some(Cursor::column(self.col.clone(), v))
    }

    fn name(&self) -> &'static str {
        "increment-column"
    }
}

pub fn strategy_for(table: &TableDescriptor) -> Arc<dyn OffsetStrategy> {
    match &table.increment_col {
        Some(col) => Arc::new(IncrementOffset { col: col.clone() }),
        None => Arc::new(RowOffset {
            order_by: table.order_by.clone(),
        }),
    }
}

/// Builds the page query for `table` starting at `cursor`.
pub fn page_query(
    strategy: &dyn OffsetStrategy,
    table: TableRef,
    cursor: Option<&Cursor>,
    limit: u64,
) -> Select {
    strategy
        .apply_to_builder(SelectBuilder::from(table), cursor, limit)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{dialect::BigQuery, renderer::to_sql};
    use model::core::value::{FieldValue, Value};

    fn table() -> TableRef {
        TableRef::new("proj", "shop", "orders")
    }

    fn row(col: &str, v: Value) -> RowData {
        RowData::new(
            "orders",
            vec![FieldValue {
                name: col.to_string(),
                data_type: v.data_type(),
                value: v,
            }],
        )
    }

    #[test]
    fn increment_snapshot_has_no_predicate() {
        let s = IncrementOffset {
            col: "updated_at".into(),
        };
        let sql = to_sql(&page_query(&s, table(), None, 100), &BigQuery);
        assert_eq!(
            sql,
            "SELECT * FROM `proj.shop.orders` ORDER BY `updated_at` LIMIT 100"
        );
    }

    #[test]
    fn increment_resume_is_strictly_greater() {
        let s = IncrementOffset { col: "id".into() };
        let cur = Cursor::column("id", Value::Int(41));
        let sql = to_sql(&page_query(&s, table(), Some(&cur), 100), &BigQuery);
        assert_eq!(
            sql,
            "SELECT * FROM `proj.shop.orders` WHERE `id` > 41 ORDER BY `id` LIMIT 100"
        );

        let cur = Cursor::column("id", Value::String("2024-01-01".into()));
        let sql = to_sql(&page_query(&s, table(), Some(&cur), 10), &BigQuery);
        assert!(sql.contains("WHERE `id` > '2024-01-01'"));
    }

    #[test]
    fn increment_resume_past_a_non_finite_float() {
        let s = IncrementOffset {
            col: "score".into(),
        };
        let cur = Cursor::column("score", Value::Float(f64::NAN));
        let sql = to_sql(&page_query(&s, table(), Some(&cur), 100), &BigQuery);
        assert_eq!(
            sql,
            "SELECT * FROM `proj.shop.orders` WHERE `score` > CAST('NaN' AS FLOAT64) ORDER BY `score` LIMIT 100"
        );
    }

    #[test]
    fn row_offset_pages_with_offset() {
        let s = RowOffset { order_by: None };
        let sql = to_sql(&page_query(&s, table(), None, 100), &BigQuery);
        assert_eq!(sql, "SELECT * FROM `proj.shop.orders` LIMIT 100 OFFSET 0");

        let sql = to_sql(
            &page_query(&s, table(), Some(&Cursor::offset(200)), 100),
            &BigQuery,
        );
        assert_eq!(sql, "SELECT * FROM `proj.shop.orders` LIMIT 100 OFFSET 200");
    }

    #[test]
    fn row_offset_honours_explicit_order() {
        let s = RowOffset {
            order_by: Some("created".into()),
        };
        let sql = to_sql(&page_query(&s, table(), None, 5), &BigQuery);
        assert_eq!(
            sql,
            "SELECT * FROM `proj.shop.orders` ORDER BY `created` LIMIT 5 OFFSET 0"
        );
    }

    #[test]
    fn next_cursor_counts_rows_or_copies_value() {
        let r = row("id", Value::Int(9));
        let offset = RowOffset { order_by: None };
        assert_eq!(offset.next_cursor(&r, None), Some(Cursor::offset(1)));
        assert_eq!(
            offset.next_cursor(&r, Some(&Cursor::offset(99))),
            Some(Cursor::offset(100))
        );

        let inc = IncrementOffset { col: "id".into() };
        assert_eq!(
            inc.next_cursor(&r, None),
            Some(Cursor::column("id", Value::Int(9)))
        );

        let null_row = row("id", Value::Null);
        let prev = Cursor::column("id", Value::Int(3));
        assert_eq!(inc.next_cursor(&null_row, Some(&prev)), Some(prev.clone()));
        assert_eq!(inc.next_cursor(&null_row, None), None);
    }

    #[test]
    fn strategy_follows_descriptor() {
        let t = TableDescriptor::new("users").with_increment("updated_at");
        assert_eq!(strategy_for(&t).name(), "increment-column");
        assert_eq!(
            strategy_for(&TableDescriptor::new("orders")).name(),
            "row-offset"
        );
    }
}
