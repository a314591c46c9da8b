use crate::pagination::cursor::Cursor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one source table and how it is ordered and keyed.
/// Re-derived from configuration at every polling tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub increment_col: Option<String>,
    pub primary_key: Option<String>,
    pub order_by: Option<String>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            increment_col: None,
            primary_key: None,
            order_by: None,
        }
    }

    pub fn with_increment(mut self, col: impl Into<String>) -> Self {
        self.increment_col = Some(col.into());
        self
    }

    pub fn with_primary_key(mut self, col: impl Into<String>) -> Self {
        self.primary_key = Some(col.into());
        self
    }

    pub fn with_order_by(mut self, col: impl Into<String>) -> Self {
        self.order_by = Some(col.into());
        self
    }

    /// Mode for a cycle that would start from `cursor`.
    pub fn mode(&self, cursor: Option<&Cursor>) -> SyncMode {
        match cursor {
            Some(c) if c.matches_increment(self.increment_col.as_deref()) => SyncMode::Incremental,
            _ => SyncMode::Snapshot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// No usable cursor: read the table from the beginning.
    Snapshot,
    /// Resume strictly after the recorded cursor.
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Snapshot => write!(f, "snapshot"),
            SyncMode::Incremental => write!(f, "incremental"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;

    #[test]
    fn mode_follows_cursor_presence() {
        let orders = TableDescriptor::new("orders");
        assert_eq!(orders.mode(None), SyncMode::Snapshot);
        assert_eq!(orders.mode(Some(&Cursor::offset(100))), SyncMode::Incremental);

        let users = TableDescriptor::new("users").with_increment("updated_at");
        let cur = Cursor::column("updated_at", Value::Int(3));
        assert_eq!(users.mode(Some(&cur)), SyncMode::Incremental);
        // an offset cursor left over from a run without an increment column is not usable
        assert_eq!(users.mode(Some(&Cursor::offset(3))), SyncMode::Snapshot);
    }
}
