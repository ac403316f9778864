//! Process signals that stop the service.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::AppError;

/// Cancel `token` on Ctrl-C, or on SIGTERM on unix.
///
/// The SIGTERM handler is installed before this returns, so a signal that
/// arrives right after startup still drains the server instead of killing it.
pub fn spawn_watcher(token: CancellationToken) -> Result<JoinHandle<()>, AppError> {
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .map_err(|e| AppError::Server(format!("cannot listen for SIGTERM: {e}")))?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let terminated = async move {
            terminate.recv().await;
        };
        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            () = interrupted => info!("ctrl-c received, initiating shutdown"),
            () = terminated => info!("SIGTERM received, initiating shutdown"),
        }
        token.cancel();
    }))
}
