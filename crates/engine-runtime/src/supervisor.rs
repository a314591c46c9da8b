use crate::error::SyncError;
use std::{
    future::Future,
    sync::{Arc, OnceLock},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error};

/// Task group sharing one cancellation token.
///
/// The first error from any task is kept and cancels the whole group; later
/// errors are only logged.
#[derive(Clone, Default)]
pub struct Supervisor {
    cancel: CancellationToken,
    tracker: TaskTracker,
    error: Arc<OnceLock<Arc<SyncError>>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn spawn<F>(&self, name: &str, task: F)
    where
        F: Future<Output = Result<(), SyncError>> + Send + 'static,
    {
        self.tracker.spawn(self.supervised(name, task));
    }

    /// Spawns a task that is also counted by `cohort`, so its caller can wait
    /// for just that group.
    pub fn spawn_in<F>(&self, cohort: &TaskTracker, name: &str, task: F)
    where
        F: Future<Output = Result<(), SyncError>> + Send + 'static,
    {
        self.tracker
            .spawn(cohort.track_future(self.supervised(name, task)));
    }

    fn supervised<F>(&self, name: &str, task: F) -> impl Future<Output = ()> + Send + 'static
    where
        F: Future<Output = Result<(), SyncError>> + Send + 'static,
    {
        let supervisor = self.clone();
        let name = name.to_string();
        async move {
            // a panic surfaces as a JoinError instead of vanishing with the task
            let result = match tokio::spawn(task).await {
                Ok(result) => result,
                Err(join) => Err(SyncError::TaskJoin(join)),
            };
            if let Err(e) = result {
                error!(task = %name, error = %e, "Supervised task failed");
                supervisor.kill(e);
            }
        }
    }

    /// Records `err` if it is the first, and cancels every task.
    pub fn kill(&self, err: SyncError) {
        match self.error.set(Arc::new(err)) {
            Ok(()) => debug!("Supervisor killed"),
            Err(later) => debug!(error = %later, "Supervisor already dead, dropping error"),
        }
        self.cancel.cancel();
    }

    pub fn is_dead(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn err(&self) -> Option<Arc<SyncError>> {
        self.error.get().cloned()
    }

    /// Closes the group and waits for all of its tasks to finish.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
