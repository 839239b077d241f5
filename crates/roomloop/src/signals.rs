//! Signal handling for graceful client shutdown.
//!
//! The host loop selects on [`setup_signal_handlers`] next to its frame timer
//! and leaves the loop once a termination signal arrives.

use tokio::signal;
use tracing::info;

/// Waits for SIGINT or SIGTERM (Ctrl+C on Windows) and logs it.
pub async fn setup_signal_handlers() -> Result<(), Box<dyn std::error::Error>> {
    setup_signal_handlers_silent().await?;
    info!("📡 Received shutdown signal - stopping the frame loop");
    Ok(())
}

/// Same as [`setup_signal_handlers`] without logging.
pub async fn setup_signal_handlers_silent() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
