use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

/// Per-table read position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Cursor {
    /// Row offset into a scan with no increment column. Counts rows consumed.
    Offset { offset: u64 },

    /// Last seen value of the increment column; the next page starts strictly after it.
    Column { column: String, value: Value },
}

impl Cursor {
    pub fn offset(offset: u64) -> Self {
        Cursor::Offset { offset }
    }

    pub fn column(column: impl Into<String>, value: Value) -> Self {
        Cursor::Column {
            column: column.into(),
            value,
        }
    }

    /// Whether this cursor can drive a table read with the given increment column.
    pub fn matches_increment(&self, increment_col: Option<&str>) -> bool {
        match (self, increment_col) {
            (Cursor::Offset { .. }, None) => true,
            (Cursor::Column { column, .. }, Some(col)) => column.eq_ignore_ascii_case(col),
            _ => false,
        }
    }

    /// Ordering between two positions of the same kind; `None` across kinds.
    pub fn compare(&self, other: &Cursor) -> Option<Ordering> {
        match (self, other) {
            (Cursor::Offset { offset: a }, Cursor::Offset { offset: b }) => Some(a.cmp(b)),
            (
                Cursor::Column {
                    column: ca,
                    value: va,
                },
                Cursor::Column {
                    column: cb,
                    value: vb,
                },
            ) if ca.eq_ignore_ascii_case(cb) => va.compare(vb),
            _ => None,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Offset { offset } => write!(f, "offset={offset}"),
            Cursor::Column { column, value } => write!(f, "{column}>{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_both_shapes() {
        let off = serde_json::to_value(Cursor::offset(200)).unwrap();
        assert_eq!(off, serde_json::json!({ "offset": 200 }));

        let col = Cursor::column("updated_at", Value::Int(5));
        let json = serde_json::to_string(&col).unwrap();
        let back: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, col);
    }

    #[test]
    fn matches_only_its_own_mode() {
        assert!(Cursor::offset(1).matches_increment(None));
        assert!(!Cursor::offset(1).matches_increment(Some("id")));
        let col = Cursor::column("ID", Value::Int(1));
        assert!(col.matches_increment(Some("id")));
        assert!(!col.matches_increment(Some("updated_at")));
        assert!(!col.matches_increment(None));
    }

    #[test]
    fn compares_same_kind_only() {
        assert_eq!(
            Cursor::offset(1).compare(&Cursor::offset(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Cursor::offset(1).compare(&Cursor::column("id", Value::Int(1))),
            None
        );
    }
}
