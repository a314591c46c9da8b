use model::pagination::cursor::Cursor;
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};
use tracing::trace;

/// Table name to read position, shared by the readers of a run.
///
/// Every access takes the lock for a single map operation; it is never held
/// across I/O.
#[derive(Debug, Default)]
pub struct CursorStore {
    cursors: Mutex<BTreeMap<String, Cursor>>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(cursors: BTreeMap<String, Cursor>) -> Self {
        Self {
            cursors: Mutex::new(cursors),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Cursor>> {
        // a panicking writer cannot leave a half-written entry behind
        self.cursors.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn get(&self, table: &str) -> Option<Cursor> {
        self.lock().get(table).cloned()
    }

    /// Overwrites the table's cursor.
    pub fn set(&self, table: &str, cursor: Cursor) {
        trace!(table, cursor = %cursor, "Cursor advanced");
        self.lock().insert(table.to_string(), cursor);
    }

    pub fn snapshot(&self) -> BTreeMap<String, Cursor> {
        self.lock().clone()
    }

    /// The map as it will stand once `table` moves to `cursor`.
    pub fn snapshot_with(&self, table: &str, cursor: &Cursor) -> BTreeMap<String, Cursor> {
        let mut map = self.snapshot();
        map.insert(table.to_string(), cursor.clone());
        map
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;
    use std::sync::Arc;

    #[test]
    fn set_overwrites_and_overlay_leaves_store_untouched() {
        let store = CursorStore::new();
        assert!(store.get("orders").is_none());

        store.set("orders", Cursor::offset(100));
        store.set("orders", Cursor::offset(200));
        assert_eq!(store.get("orders"), Some(Cursor::offset(200)));

        let next = Cursor::column("updated_at", Value::Int(5));
        let overlay = store.snapshot_with("users", &next);
        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay.get("users"), Some(&next));
        assert!(store.get("users").is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_writers_do_not_lose_tables() {
        let store = Arc::new(CursorStore::new());
        let mut handles = Vec::new();
        for t in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let table = format!("t{t}");
                for i in 1..=50 {
                    store.set(&table, Cursor::offset(i));
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 8);
        assert!(snapshot.values().all(|c| *c == Cursor::offset(50)));
    }
}
