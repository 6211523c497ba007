use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

/// Cancel `token` on SIGINT or SIGTERM.
///
/// Handlers are registered before returning so a signal that arrives
/// while the destination is being resolved is not lost.
#[cfg(unix)]
pub fn cancel_on_signal(token: CancellationToken) -> Result<JoinHandle<()>, CliError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).map_err(CliError::Signal)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(CliError::Signal)?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("SIGTERM received, stopping"),
            _ = sigint.recv() => tracing::info!("SIGINT received, stopping"),
            _ = token.cancelled() => return,
        }
        token.cancel();
    }))
}

#[cfg(not(unix))]
pub fn cancel_on_signal(token: CancellationToken) -> Result<JoinHandle<()>, CliError> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                tracing::info!("Ctrl+C received, stopping");
            }
            _ = token.cancelled() => return,
        }
        token.cancel();
    }))
}
