//! Defines the `Dialect` trait for warehouse-specific SQL syntax.

use crate::query::ast::common::TableRef;
use model::core::value::{TIMESTAMP_FORMAT, Value};

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Renders a fully qualified table reference.
    fn render_table(&self, table: &TableRef) -> String;

    /// Renders a value as an inline SQL literal.
    /// Numeric values are emitted bare; strings and temporal values are quoted.
    fn render_literal(&self, value: &Value) -> String;

    /// Returns the name of the dialect.
    fn name(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BigQuery;

impl BigQuery {
    fn quote_string(s: &str) -> String {
        let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
        format!("'{escaped}'")
    }
}

impl Dialect for BigQuery {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', ""))
    }

    fn render_table(&self, table: &TableRef) -> String {
        // a single quoted path, as the console writes it
        format!(
            "`{}.{}.{}`",
            table.project.replace('`', ""),
            table.dataset.replace('`', ""),
            table.name.replace('`', "")
        )
    }

    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Int(v) => v.to_string(),
            Value::Float(v) if v.is_nan() => "CAST('NaN' AS FLOAT64)".to_string(),
            Value::Float(v) if v.is_infinite() => {
                let text = if *v > 0.0 { "inf" } else { "-inf" };
                format!("CAST('{text}' AS FLOAT64)")
            }
            Value::Float(v) => v.to_string(),
            Value::Numeric(v) => v.clone(),
            Value::Boolean(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
            Value::Null => "NULL".to_string(),
            Value::Timestamp(ts) => Self::quote_string(&ts.format(TIMESTAMP_FORMAT).to_string()),
            other => Self::quote_string(&other.to_string()),
        }
    }

    fn name(&self) -> String {
        "BigQuery".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn numerics_are_bare_and_text_is_quoted() {
        let d = BigQuery;
        assert_eq!(d.render_literal(&Value::Int(42)), "42");
        assert_eq!(d.render_literal(&Value::Numeric("1.50".into())), "1.50");
        assert_eq!(d.render_literal(&Value::String("o'hara".into())), r"'o\'hara'");
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(d.render_literal(&Value::Date(date)), "'2024-01-31'");
    }

    #[test]
    fn non_finite_floats_render_as_casts() {
        let d = BigQuery;
        assert_eq!(
            d.render_literal(&Value::Float(f64::NAN)),
            "CAST('NaN' AS FLOAT64)"
        );
        assert_eq!(
            d.render_literal(&Value::Float(f64::INFINITY)),
            "CAST('inf' AS FLOAT64)"
        );
        assert_eq!(
            d.render_literal(&Value::Float(f64::NEG_INFINITY)),
            "CAST('-inf' AS FLOAT64)"
        );
        assert_eq!(d.render_literal(&Value::Float(2.5)), "2.5");
    }

    #[test]
    fn qualifies_tables_in_one_quoted_path() {
        let t = TableRef::new("proj", "sales", "orders");
        assert_eq!(BigQuery.render_table(&t), "`proj.sales.orders`");
    }
}
