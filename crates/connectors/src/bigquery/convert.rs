//! Conversion of REST result cells into typed values.
//!
//! Every scalar arrives as a JSON string. TIMESTAMP cells are requested as
//! int64 microseconds since the epoch.

use crate::{
    bigquery::models::{TableRow, TableSchema},
    error::WarehouseError,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    records::{
        row::RowData,
        schema::{Field, Schema},
    },
};

pub fn schema_from(table_schema: &TableSchema) -> Schema {
    table_schema
        .fields
        .iter()
        .map(|f| Field {
            name: f.name.clone(),
            data_type: DataType::from_bigquery_type(&f.field_type),
            repeated: f
                .mode
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case("REPEATED")),
        })
        .collect()
}

pub fn row_from(table: &str, schema: &[Field], row: &TableRow) -> Result<RowData, WarehouseError> {
    if row.f.len() != schema.len() {
        return Err(WarehouseError::Decode(format!(
            "row has {} cells but schema has {} fields",
            row.f.len(),
            schema.len()
        )));
    }

    let field_values = schema
        .iter()
        .zip(&row.f)
        .map(|(field, cell)| {
            Ok(FieldValue {
                name: field.name.clone(),
                value: cell_value(field, &cell.v)?,
                data_type: field.data_type.clone(),
            })
        })
        .collect::<Result<Vec<_>, WarehouseError>>()?;

    Ok(RowData::new(table, field_values))
}

pub fn cell_value(field: &Field, raw: &serde_json::Value) -> Result<Value, WarehouseError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if field.repeated || field.data_type == DataType::Record {
        return Ok(Value::Json(nested_json(raw)));
    }

    let Some(text) = raw.as_str() else {
        return Err(decode_err(field, raw));
    };

    let value = match &field.data_type {
        DataType::Integer => Value::Int(text.parse().map_err(|_| decode_err(field, raw))?),
        DataType::Float => Value::Float(text.parse().map_err(|_| decode_err(field, raw))?),
        DataType::Numeric | DataType::BigNumeric => Value::Numeric(text.to_string()),
        DataType::Boolean => Value::Boolean(text.eq_ignore_ascii_case("true")),
        DataType::Json => serde_json::from_str(text)
            .map(Value::Json)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        DataType::Date => Value::Date(
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| decode_err(field, raw))?,
        ),
        DataType::Time => Value::Time(
            NaiveTime::parse_from_str(text, "%H:%M:%S%.f").map_err(|_| decode_err(field, raw))?,
        ),
        DataType::DateTime => Value::DateTime(
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
                .map_err(|_| decode_err(field, raw))?,
        ),
        DataType::Timestamp => Value::Timestamp(
            parse_timestamp(text).ok_or_else(|| decode_err(field, raw))?,
        ),
        // BYTES stay base64 text; GEOGRAPHY stays WKT
        _ => Value::String(text.to_string()),
    };

    Ok(value)
}

/// Accepts int64 microseconds, or float seconds as older endpoints send them.
fn parse_timestamp(text: &str) -> Option<DateTime<chrono::Utc>> {
    if let Ok(micros) = text.parse::<i64>() {
        return DateTime::from_timestamp_micros(micros);
    }
    let secs = text.parse::<f64>().ok()?;
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
}

/// Unwraps the `{"f": [{"v": ..}]}` / `[{"v": ..}]` envelopes of nested cells.
fn nested_json(raw: &serde_json::Value) -> serde_json::Value {
    match raw {
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(unwrap_cell).collect())
        }
        serde_json::Value::Object(obj) => match obj.get("f") {
            Some(serde_json::Value::Array(cells)) => {
                serde_json::Value::Array(cells.iter().map(unwrap_cell).collect())
            }
            _ => raw.clone(),
        },
        other => other.clone(),
    }
}

fn unwrap_cell(cell: &serde_json::Value) -> serde_json::Value {
    match cell.get("v") {
        Some(inner) => nested_json(inner),
        None => cell.clone(),
    }
}

fn decode_err(field: &Field, raw: &serde_json::Value) -> WarehouseError {
    WarehouseError::Decode(format!(
        "cannot read {} value {raw} for column `{}`",
        field.data_type, field.name
    ))
}
