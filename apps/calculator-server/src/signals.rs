use std::future::Future;

use anyhow::Result;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What ended a [`cancel_on`] wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// Ctrl+C or SIGTERM arrived.
    Signal,
    /// Signal handlers could not be installed; stopping is the safe choice.
    SignalError,
    /// Someone else cancelled first (the server stopped on its own).
    Cancelled,
}

/// Cancel the pipeline's root token on Ctrl+C or SIGTERM.
///
/// The task also ends, without doing anything, once the token is cancelled
/// elsewhere.
#[must_use]
pub fn spawn_shutdown_listener(cancel: CancellationToken) -> JoinHandle<ShutdownCause> {
    tokio::spawn(async move { cancel_on(wait_for_signal(), &cancel).await })
}

/// Cancel `cancel` when `signal` resolves, unless it is cancelled first.
pub async fn cancel_on<F>(signal: F, cancel: &CancellationToken) -> ShutdownCause
where
    F: Future<Output = Result<()>>,
{
    let cause = tokio::select! {
        () = cancel.cancelled() => return ShutdownCause::Cancelled,
        result = signal => match result {
            Ok(()) => ShutdownCause::Signal,
            Err(e) => {
                tracing::error!(error = %e, "Signal handling failed, shutting down");
                ShutdownCause::SignalError
            }
        },
    };

    tracing::info!(?cause, "Stopping calculator: HTTP server, then event consumer");
    cancel.cancel();
    cause
}

async fn wait_for_signal() -> Result<()> {
    tokio::select! {
        result = signal::ctrl_c() => {
            result?;
            tracing::info!("Received Ctrl+C signal");
        }
        result = wait_sigterm() => result?,
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_sigterm() -> Result<()> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    sigterm.recv().await;
    tracing::info!("Received SIGTERM signal");
    Ok(())
}

#[cfg(not(unix))]
async fn wait_sigterm() -> Result<()> {
    std::future::pending::<Result<()>>().await
}
