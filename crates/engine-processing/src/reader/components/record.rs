use model::{
    core::value::{TIMESTAMP_FORMAT, Value},
    pagination::position::Position,
    records::{
        record::{ChangeRecord, StructuredData},
        row::RowData,
    },
};
use tracing::{trace, warn};

/// Column values of `row`, with TIMESTAMP columns rendered in their fixed text form.
pub fn payload(row: &RowData) -> StructuredData {
    row.field_values
        .iter()
        .map(|fv| {
            let value = match &fv.value {
                Value::Timestamp(ts) => Value::String(ts.format(TIMESTAMP_FORMAT).to_string()),
                other => other.clone(),
            };
            (fv.name.clone(), value)
        })
        .collect()
}

/// Serialized value of the primary-key column, when one is configured and present.
pub fn key(row: &RowData, primary_key: Option<&str>) -> Option<Vec<u8>> {
    let column = primary_key?;
    let Some(field) = row.get(column) else {
        trace!(table = %row.entity, column, "Primary key column missing from row");
        return None;
    };

    match serde_json::to_vec(&field.value.to_json()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(table = %row.entity, column, error = %e, "Failed to serialize record key");
            None
        }
    }
}

pub fn build(row: &RowData, primary_key: Option<&str>, position: Position) -> ChangeRecord {
    ChangeRecord {
        table: row.entity.clone(),
        created_at: chrono::Utc::now(),
        payload: payload(row),
        key: key(row, primary_key),
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use model::core::value::FieldValue;

    fn row() -> RowData {
        let fields = vec![
            ("id", Value::Int(7)),
            ("email", Value::String("a@b.c".into())),
            (
                "seen",
                Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            ),
        ];
        RowData::new(
            "users",
            fields
                .into_iter()
                .map(|(name, value)| FieldValue {
                    name: name.into(),
                    data_type: value.data_type(),
                    value,
                })
                .collect(),
        )
    }

    #[test]
    fn payload_normalizes_timestamps() {
        let payload = payload(&row());
        assert_eq!(payload["id"], Value::Int(7));
        assert_eq!(
            payload["seen"],
            Value::String("2024-01-02 03:04:05.000000 UTC".into())
        );
    }

    #[test]
    fn key_is_the_serialized_primary_key() {
        assert_eq!(key(&row(), Some("id")), Some(b"7".to_vec()));
        assert_eq!(key(&row(), Some("EMAIL")), Some(b"\"a@b.c\"".to_vec()));
        assert_eq!(key(&row(), Some("missing")), None);
        assert_eq!(key(&row(), None), None);
    }

    #[test]
    fn build_carries_table_and_position() {
        let record = build(&row(), Some("id"), Position::from(b"{}".to_vec()));
        assert_eq!(record.table, "users");
        assert_eq!(record.position.as_bytes(), b"{}");
        assert_eq!(record.payload.len(), 3);
    }
}
