use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Ends a running `bqsync sync` on SIGINT or SIGTERM.
///
/// The signal cancels the host loop's token; the loop then tears the source
/// down, so positions already printed stay persisted.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancel_token: CancellationToken,
    signalled: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            cancel_token,
            signalled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawns the listener. A handler that cannot be installed is logged and
    /// that signal is simply never seen.
    pub fn register_handlers(&self) {
        let cancel_token = self.cancel_token.clone();
        let signalled = self.signalled.clone();

        tokio::spawn(async move {
            let interrupt = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!(error = %e, "Cannot listen for SIGINT");
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sig) => {
                        sig.recv().await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Cannot listen for SIGTERM");
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            let name = tokio::select! {
                _ = interrupt => "SIGINT",
                _ = terminate => "SIGTERM",
            };
            info!(signal = name, "Stopping sync");

            signalled.store(true, Ordering::SeqCst);
            cancel_token.cancel();
        });
    }

    /// Whether the sync ended because of a signal rather than on its own.
    pub fn is_shutdown_requested(&self) -> bool {
        self.signalled.load(Ordering::SeqCst)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

/// Process status of `bqsync`.
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    /// Any command error, including a sync killed by a warehouse failure.
    GeneralError = 1,
    /// Sync stopped by a signal; 128 + SIGINT, as shells report it.
    ShutdownRequested = 130,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}
