use crate::{core::value::Value, pagination::position::Position};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Column name to value. Column order carries no meaning.
pub type StructuredData = BTreeMap<String, Value>;

/// One emitted change: a single warehouse row plus everything needed to resume after it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub table: String,
    pub created_at: DateTime<Utc>,
    pub payload: StructuredData,
    /// Serialized primary-key value; absent when no key column is configured.
    pub key: Option<Vec<u8>>,
    pub position: Position,
}

/// Wire shape of a record for hosts that speak JSON.
#[derive(Debug, Serialize)]
pub struct RecordView<'a> {
    pub table: &'a str,
    pub created_at: String,
    pub key: Option<String>,
    pub position: String,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl ChangeRecord {
    pub fn payload_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.payload
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    pub fn view(&self) -> RecordView<'_> {
        RecordView {
            table: &self.table,
            created_at: self.created_at.to_rfc3339(),
            key: self
                .key
                .as_ref()
                .map(|k| String::from_utf8_lossy(k).into_owned()),
            position: String::from_utf8_lossy(self.position.as_bytes()).into_owned(),
            payload: self.payload_json(),
        }
    }
}
