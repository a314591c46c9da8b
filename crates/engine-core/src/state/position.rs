//! Resume position encoding.
//!
//! A position is the JSON document `{"tables": {"<table>": <cursor>}}`. The
//! same encoding is attached to every record and handed back on open.

use crate::error::StateError;
use model::{
    core::value::Value,
    pagination::{cursor::Cursor, position::Position},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PositionDoc {
    #[serde(default)]
    tables: BTreeMap<String, Cursor>,
}

#[derive(Serialize)]
struct PositionDocRef<'a> {
    tables: &'a BTreeMap<String, Cursor>,
}

/// Encodes cursor maps and decodes positions, including the single-scalar
/// form written for one-table sources.
#[derive(Debug, Clone, Default)]
pub struct PositionCodec {
    single_table: Option<String>,
    increment_col: Option<String>,
}

impl PositionCodec {
    pub fn new(single_table: Option<String>, increment_col: Option<String>) -> Self {
        Self {
            single_table,
            increment_col,
        }
    }

    pub fn encode(&self, cursors: &BTreeMap<String, Cursor>) -> Result<Position, StateError> {
        let doc = PositionDocRef { tables: cursors };
        Ok(Position::from(serde_json::to_vec(&doc)?))
    }

    /// Cursor map stored in `position`. Anything unreadable starts every table afresh.
    pub fn decode(&self, position: &Position) -> BTreeMap<String, Cursor> {
        if position.is_empty() {
            debug!("No resume position, starting from scratch");
            return BTreeMap::new();
        }

        let raw = match serde_json::from_slice::<serde_json::Value>(position.as_bytes()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Could not parse resume position, starting from scratch");
                return BTreeMap::new();
            }
        };

        if raw.is_object() {
            return match serde_json::from_value::<PositionDoc>(raw) {
                Ok(doc) => doc.tables,
                Err(e) => {
                    warn!(error = %e, "Unrecognised resume position, starting from scratch");
                    BTreeMap::new()
                }
            };
        }

        match self.decode_scalar(&raw) {
            Some((table, cursor)) => BTreeMap::from([(table, cursor)]),
            None => {
                warn!(position = %raw, "Scalar resume position is not usable, starting from scratch");
                BTreeMap::new()
            }
        }
    }

    fn decode_scalar(&self, raw: &serde_json::Value) -> Option<(String, Cursor)> {
        let table = self.single_table.clone()?;

        let cursor = match raw {
            serde_json::Value::Number(n) => self.numeric_cursor(n.as_u64(), n.as_f64())?,
            serde_json::Value::String(s) => {
                let s = s.trim();
                if let Some(quoted) = s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
                    Cursor::column(self.increment_col.clone()?, Value::String(quoted.to_string()))
                } else if let Ok(n) = s.parse::<u64>() {
                    self.numeric_cursor(Some(n), None)?
                } else {
                    Cursor::column(self.increment_col.clone()?, Value::String(s.to_string()))
                }
            }
            _ => return None,
        };

        Some((table, cursor))
    }

    fn numeric_cursor(&self, int: Option<u64>, float: Option<f64>) -> Option<Cursor> {
        match (&self.increment_col, int) {
            (None, Some(n)) => Some(Cursor::offset(n)),
            (Some(col), Some(n)) => {
                let n = i64::try_from(n).ok()?;
                Some(Cursor::column(col.clone(), Value::Int(n)))
            }
            (Some(col), None) => Some(Cursor::column(col.clone(), Value::Float(float?))),
            (None, None) => None,
        }
    }
}
