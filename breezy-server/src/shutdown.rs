//! Signal handling: Ctrl+C or SIGTERM fans out a broadcast shutdown, then a
//! watchdog forces exit if the server has not stopped within the grace period.

use std::time::Duration;

use tokio::sync::broadcast;

/// Resolve when the process receives Ctrl+C (or SIGTERM on unix). Returns the signal name.
pub async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Wait for a signal, broadcast shutdown, and arm the forced-exit watchdog.
pub async fn on_signal(tx: broadcast::Sender<()>, grace: Duration) {
    let signal = wait_for_signal().await;
    tracing::info!("Received {}, closing server gracefully...", signal);
    let _ = tx.send(());

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::error!("Forced shutdown after {}s timeout", grace.as_secs());
        std::process::exit(1);
    });
}
