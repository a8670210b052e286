//! Signal handling for graceful shutdown.
//!
//! Cross-platform signal handling so the gateway can drain connections
//! and release registry state before exiting.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal (SIGINT/SIGTERM on Unix, Ctrl+C on
/// Windows), returning when one is received.
pub async fn setup_signal_handlers() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
