use crate::{error::SyncError, scheduler::SyncScheduler, supervisor::Supervisor};
use connectors::memory::MemoryWarehouse;
use engine_config::settings::SourceConfig;
use engine_core::{
    metrics::Metrics,
    state::{cursor_store::CursorStore, position::PositionCodec},
};
use engine_processing::reader::TableReader;
use model::{
    core::{data_type::DataType, value::Value},
    records::{record::ChangeRecord, schema::Field},
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::mpsc;

struct Fixture {
    warehouse: MemoryWarehouse,
    supervisor: Supervisor,
    metrics: Metrics,
    rx: mpsc::Receiver<ChangeRecord>,
    scheduler: SyncScheduler,
}

fn fixture(tables: &str, polling: &str) -> Fixture {
    let cfg = SourceConfig::from_map(&HashMap::from([
        ("serviceAccount".to_string(), "/dev/null".to_string()),
        ("projectID".to_string(), "proj".to_string()),
        ("datasetID".to_string(), "shop".to_string()),
        ("tableID".to_string(), tables.to_string()),
        ("pollingTime".to_string(), polling.to_string()),
    ]))
    .unwrap();

    let warehouse = MemoryWarehouse::new();
    let supervisor = Supervisor::new();
    let metrics = Metrics::new();
    let (tx, rx) = mpsc::channel(1024);
    let reader = TableReader::new(
        Arc::new(warehouse.clone()),
        Arc::new(CursorStore::new()),
        PositionCodec::default(),
        tx,
        metrics.clone(),
        "proj",
        "shop",
        100,
    );
    let scheduler = SyncScheduler::new(
        Arc::new(warehouse.clone()),
        Arc::new(cfg),
        reader,
        supervisor.clone(),
        metrics.clone(),
    );

    Fixture {
        warehouse,
        supervisor,
        metrics,
        rx,
        scheduler,
    }
}

fn table(wh: &MemoryWarehouse, name: &str, rows: i64) {
    wh.create_table(name, vec![Field::new("id", DataType::Integer)]);
    wh.insert(name, (1..=rows).map(|i| vec![Value::Int(i)]).collect());
}

fn drain(rx: &mut mpsc::Receiver<ChangeRecord>) -> Vec<ChangeRecord> {
    let mut out = Vec::new();
    while let Ok(r) = rx.try_recv() {
        out.push(r);
    }
    out
}

#[tokio::test]
async fn discovery_lists_the_dataset_unless_tables_are_given() {
    let f = fixture("", "1m");
    table(&f.warehouse, "b", 1);
    table(&f.warehouse, "a", 1);
    assert_eq!(f.scheduler.discover().await.unwrap(), vec!["a", "b"]);

    let f = fixture("orders, users", "1m");
    assert_eq!(f.scheduler.discover().await.unwrap(), vec!["orders", "users"]);
}

#[tokio::test]
async fn one_cycle_reads_every_table_and_preserves_per_table_order() {
    let mut f = fixture("*", "1m");
    table(&f.warehouse, "a", 150);
    table(&f.warehouse, "b", 30);

    f.scheduler.run_cycle().await.unwrap();

    let records = drain(&mut f.rx);
    assert_eq!(records.len(), 180);
    for name in ["a", "b"] {
        let ids: Vec<i64> = records
            .iter()
            .filter(|r| r.table == name)
            .map(|r| r.payload["id"].as_i64().unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
    assert_eq!(f.metrics.snapshot().cycles_completed, 1);
}

#[tokio::test]
async fn missing_table_does_not_fail_the_cycle() {
    let mut f = fixture("a, gone", "1m");
    table(&f.warehouse, "a", 2);

    f.scheduler.run_cycle().await.unwrap();
    assert_eq!(drain(&mut f.rx).len(), 2);
    assert_eq!(f.metrics.snapshot().tables_skipped, 1);
    assert!(!f.supervisor.is_dead());
}

#[tokio::test]
async fn discovery_failure_is_fatal() {
    let f = fixture("", "1m");
    f.warehouse.fail_listing("permission denied");
    let err = f.scheduler.run_cycle().await.unwrap_err();
    assert!(matches!(err, SyncError::Discovery(_)));
}

#[tokio::test]
async fn reader_failure_kills_the_run() {
    let f = fixture("good, bad", "1m");
    table(&f.warehouse, "good", 1);
    table(&f.warehouse, "bad", 1);
    f.warehouse.fail_queries_on("bad", "backend error");

    let supervisor = f.supervisor.clone();
    supervisor.spawn("scheduler", f.scheduler.run());
    tokio::time::timeout(Duration::from_secs(5), supervisor.wait())
        .await
        .unwrap();

    assert!(supervisor.is_dead());
    assert!(matches!(
        supervisor.err().as_deref(),
        Some(SyncError::Reader(_))
    ));
}

#[tokio::test]
async fn ticks_pick_up_new_rows_and_new_tables() {
    let mut f = fixture("", "50ms");
    table(&f.warehouse, "a", 3);

    let supervisor = f.supervisor.clone();
    let warehouse = f.warehouse.clone();
    supervisor.spawn("scheduler", f.scheduler.run());

    let mut seen = Vec::new();
    while seen.len() < 3 {
        let record = tokio::time::timeout(Duration::from_secs(5), f.rx.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push(record);
    }

    table(&warehouse, "b", 2);
    warehouse.insert("a", vec![vec![Value::Int(4)]]);

    while seen.len() < 6 {
        let record = tokio::time::timeout(Duration::from_secs(5), f.rx.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push(record);
    }

    let mut later: Vec<(String, i64)> = seen[3..]
        .iter()
        .map(|r| (r.table.clone(), r.payload["id"].as_i64().unwrap()))
        .collect();
    later.sort();
    assert_eq!(
        later,
        vec![("a".to_string(), 4), ("b".to_string(), 1), ("b".to_string(), 2)]
    );

    supervisor.kill(SyncError::Stopped);
    tokio::time::timeout(Duration::from_secs(5), supervisor.wait())
        .await
        .unwrap();
    assert!(f.metrics.snapshot().cycles_completed >= 1);
}
