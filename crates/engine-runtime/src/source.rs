//! Host-facing source lifecycle: configure, open, read, ack, teardown.

use crate::{
    error::{ReadError, SyncError},
    scheduler::SyncScheduler,
    supervisor::Supervisor,
};
use async_trait::async_trait;
use connectors::{
    bigquery::{BigQueryClient, BigQueryOptions},
    warehouse::Warehouse,
};
use engine_config::settings::{CHANNEL_CAPACITY, PAGE_SIZE, SourceConfig};
use engine_core::{
    metrics::{Metrics, MetricsSnapshot},
    state::{cursor_store::CursorStore, position::PositionCodec},
};
use engine_processing::reader::TableReader;
use model::{
    pagination::{cursor::Cursor, position::Position},
    records::record::ChangeRecord,
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// Lifecycle a host drives a source through, in this order.
#[async_trait]
pub trait SourceConnector: Send {
    async fn configure(&mut self, cfg: &HashMap<String, String>) -> Result<(), SyncError>;

    /// Starts syncing from `position`, or from scratch when there is none.
    async fn open(&mut self, position: Option<Position>) -> Result<(), SyncError>;

    /// Next buffered record. Never waits: [`ReadError::BackoffRetry`] means
    /// nothing is ready yet.
    fn read(&mut self) -> Result<ChangeRecord, ReadError>;

    async fn ack(&mut self, position: &Position) -> Result<(), SyncError>;

    async fn teardown(&mut self) -> Result<(), SyncError>;
}

struct Running {
    warehouse: Arc<dyn Warehouse>,
    supervisor: Supervisor,
    records: mpsc::Receiver<ChangeRecord>,
    cursors: Arc<CursorStore>,
    metrics: Metrics,
    torn_down: bool,
}

/// Incremental warehouse table source.
#[derive(Default)]
pub struct WarehouseSource {
    config: Option<Arc<SourceConfig>>,
    client: Option<Arc<dyn Warehouse>>,
    running: Option<Running>,
}

impl WarehouseSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `client` instead of building a BigQuery client from the key file.
    pub fn with_client(client: Arc<dyn Warehouse>) -> Self {
        Self {
            client: Some(client),
            ..Self::default()
        }
    }

    pub fn config(&self) -> Option<&SourceConfig> {
        self.config.as_deref()
    }

    pub fn cursors(&self) -> Option<BTreeMap<String, Cursor>> {
        self.running.as_ref().map(|r| r.cursors.snapshot())
    }

    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.running.as_ref().map(|r| r.metrics.snapshot())
    }

    async fn connect(&self, config: &SourceConfig) -> Result<Arc<dyn Warehouse>, SyncError> {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }
        let options =
            BigQueryOptions::new(&config.project_id).with_location(config.location.clone());
        let client = BigQueryClient::from_service_account_file(&config.service_account, options)
            .await?;
        Ok(Arc::new(client))
    }
}

#[async_trait]
impl SourceConnector for WarehouseSource {
    async fn configure(&mut self, cfg: &HashMap<String, String>) -> Result<(), SyncError> {
        let config = SourceConfig::from_map(cfg)?;
        info!(source = %config.source_id(), "Source configured");
        self.config = Some(Arc::new(config));
        Ok(())
    }

    async fn open(&mut self, position: Option<Position>) -> Result<(), SyncError> {
        let config = self.config.clone().ok_or(SyncError::NotConfigured)?;
        let warehouse = self.connect(&config).await?;

        let codec = PositionCodec::new(
            config.single_table().map(str::to_string),
            config.increment_column.clone(),
        );
        let resumed = codec.decode(&position.unwrap_or_default());
        info!(
            source = %config.source_id(),
            tables = resumed.len(),
            "Opening source"
        );
        let cursors = Arc::new(CursorStore::from_map(resumed));

        let (records_tx, records) = mpsc::channel(CHANNEL_CAPACITY);
        let metrics = Metrics::new();
        let supervisor = Supervisor::new();
        let reader = TableReader::new(
            Arc::clone(&warehouse),
            Arc::clone(&cursors),
            codec,
            records_tx,
            metrics.clone(),
            &config.project_id,
            &config.dataset_id,
            PAGE_SIZE,
        );

        let scheduler = SyncScheduler::new(
            Arc::clone(&warehouse),
            config,
            reader,
            supervisor.clone(),
            metrics.clone(),
        );
        supervisor.spawn("scheduler", scheduler.run());

        self.running = Some(Running {
            warehouse,
            supervisor,
            records,
            cursors,
            metrics,
            torn_down: false,
        });
        Ok(())
    }

    fn read(&mut self) -> Result<ChangeRecord, ReadError> {
        let Some(running) = self.running.as_mut() else {
            return Err(ReadError::NotOpen);
        };

        if running.supervisor.is_dead() {
            return Err(terminal(&running.supervisor));
        }

        match running.records.try_recv() {
            Ok(record) => Ok(record),
            Err(TryRecvError::Empty) => Err(ReadError::BackoffRetry),
            Err(TryRecvError::Disconnected) => Err(terminal(&running.supervisor)),
        }
    }

    async fn ack(&mut self, position: &Position) -> Result<(), SyncError> {
        debug!(position = %position, "Ack");
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), SyncError> {
        let Some(running) = self.running.as_mut() else {
            return Ok(());
        };
        if running.torn_down {
            return Ok(());
        }
        running.torn_down = true;

        info!("Tearing down source");
        running.supervisor.kill(SyncError::Stopped);
        running.records.close();
        running.supervisor.wait().await;

        if let Err(e) = running.warehouse.close().await {
            warn!(error = %e, "Failed to close warehouse client");
        }
        Ok(())
    }
}

fn terminal(supervisor: &Supervisor) -> ReadError {
    match supervisor.err() {
        Some(err) if !matches!(*err, SyncError::Stopped) => ReadError::Terminated(err),
        _ => ReadError::Stopped,
    }
}
