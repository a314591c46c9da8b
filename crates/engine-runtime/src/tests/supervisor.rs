use crate::{error::SyncError, supervisor::Supervisor};
use connectors::error::WarehouseError;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn first_error_wins_and_cancels_everyone() {
    let supervisor = Supervisor::new();

    let token = supervisor.token();
    supervisor.spawn("sleeper", async move {
        token.cancelled().await;
        Ok(())
    });
    supervisor.spawn("failing", async {
        Err(SyncError::Discovery(WarehouseError::Auth("expired".into())))
    });

    tokio::time::timeout(Duration::from_secs(5), supervisor.wait())
        .await
        .unwrap();

    assert!(supervisor.is_dead());
    assert!(matches!(
        supervisor.err().as_deref(),
        Some(SyncError::Discovery(_))
    ));
    assert!(logs_contain("Supervised task failed"));

    supervisor.kill(SyncError::Stopped);
    assert!(matches!(
        supervisor.err().as_deref(),
        Some(SyncError::Discovery(_))
    ));
}

#[tokio::test]
async fn kill_stops_tasks_with_the_given_error() {
    let supervisor = Supervisor::new();
    let token = supervisor.token();
    supervisor.spawn("worker", async move {
        token.cancelled().await;
        Ok(())
    });

    assert!(!supervisor.is_dead());
    supervisor.kill(SyncError::Stopped);
    tokio::time::timeout(Duration::from_secs(5), supervisor.wait())
        .await
        .unwrap();
    assert!(matches!(supervisor.err().as_deref(), Some(SyncError::Stopped)));
}

#[tokio::test]
async fn panics_become_join_errors() {
    let supervisor = Supervisor::new();
    supervisor.spawn("panicky", async {
        if true {
            panic!("boom");
        }
        Ok(())
    });
    supervisor.wait().await;
    assert!(matches!(
        supervisor.err().as_deref(),
        Some(SyncError::TaskJoin(_))
    ));
}

#[tokio::test]
async fn cohort_waits_only_for_its_own_tasks() {
    let supervisor = Supervisor::new();
    let token = supervisor.token();
    supervisor.spawn("long", async move {
        token.cancelled().await;
        Ok(())
    });

    let cohort = TaskTracker::new();
    for i in 0..3u64 {
        supervisor.spawn_in(&cohort, "short", async move {
            tokio::time::sleep(Duration::from_millis(5 * i)).await;
            Ok(())
        });
    }
    cohort.close();
    tokio::time::timeout(Duration::from_secs(5), cohort.wait())
        .await
        .unwrap();
    assert!(!supervisor.is_dead());

    supervisor.kill(SyncError::Stopped);
    supervisor.wait().await;
}
