//! Turns termination signals into cancellation.

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Waits for SIGINT, SIGTERM or SIGQUIT, then cancels `cancel`.
///
/// Returns early without cancelling if `cancel` is fired elsewhere first.
pub async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        "interrupt"
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        let term = signal(SignalKind::terminate());
        let quit = signal(SignalKind::quit());
        match (term, quit) {
            (Ok(mut term), Ok(mut quit)) => tokio::select! {
                _ = term.recv() => "terminate",
                _ = quit.recv() => "quit",
            },
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        signal = ctrl_c => info!(signal, "received signal, shutting down"),
        signal = terminate => info!(signal, "received signal, shutting down"),
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}
