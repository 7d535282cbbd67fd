//! Graceful shutdown coordination
//!
//! One [`CancellationToken`] is shared by the reader, the registry
//! coordinator and the acceptor. The coordinator cancels it, then gives the
//! components a bounded grace period to finish before the process is
//! terminated.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::DEFAULT_SHUTDOWN_GRACE;

/// Result of draining components after cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome<T> {
    /// Everything stopped inside the grace period
    Graceful(T),
    /// Grace period elapsed first
    TimedOut,
}

impl<T> ShutdownOutcome<T> {
    pub fn is_graceful(&self) -> bool {
        matches!(self, ShutdownOutcome::Graceful(_))
    }
}

/// Owns the shared cancellation token and the grace period
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace: Duration,
}

impl ShutdownCoordinator {
    /// Create a coordinator with the given grace period
    pub fn new(grace: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace,
        }
    }

    /// Get a clone of the shared token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Grace period applied by [`drain`](Self::drain)
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Whether cancellation has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token and wait up to the grace period for `completion`
    pub async fn drain<F, T>(&self, completion: F) -> ShutdownOutcome<T>
    where
        F: Future<Output = T>,
    {
        self.token.cancel();
        tracing::info!(grace_ms = self.grace.as_millis() as u64, "Shutting down");

        match tokio::time::timeout(self.grace, completion).await {
            Ok(value) => ShutdownOutcome::Graceful(value),
            Err(_) => {
                tracing::warn!(
                    grace_ms = self.grace.as_millis() as u64,
                    "Components did not stop within the grace period"
                );
                ShutdownOutcome::TimedOut
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_GRACE)
    }
}

/// Wait for Ctrl-C, or SIGTERM on unix
pub async fn wait_for_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!("Interrupt received");
    Ok(())
}

/// Terminate the process after a failed drain
pub fn force_exit() -> ! {
    tracing::error!("Forcing exit");
    std::process::exit(1)
}
