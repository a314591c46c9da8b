use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_emitted: AtomicU64,
    pages_fetched: AtomicU64,
    tables_skipped: AtomicU64,
    cycles_completed: AtomicU64,
}

/// Counters shared by every reader of a run.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_emitted: u64,
    pub pages_fetched: u64,
    /// Tables that were gone by the time their page query ran.
    pub tables_skipped: u64,
    pub cycles_completed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_records(&self, count: u64) {
        self.inner
            .records_emitted
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_pages(&self, count: u64) {
        self.inner.pages_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self, count: u64) {
        self.inner.tables_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_cycles(&self, count: u64) {
        self.inner
            .cycles_completed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_emitted: self.inner.records_emitted.load(Ordering::Relaxed),
            pages_fetched: self.inner.pages_fetched.load(Ordering::Relaxed),
            tables_skipped: self.inner.tables_skipped.load(Ordering::Relaxed),
            cycles_completed: self.inner.cycles_completed.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
