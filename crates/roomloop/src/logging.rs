//! Logging system setup and configuration.
//!
//! This module handles the initialization of the tracing-based logging system
//! with support for both human-readable and JSON output formats.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level
/// plus the networking core's own verbosity.
pub fn build_filter(config: &LoggingSettings) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = config.network_log_level.filter_directive();
    let filter = EnvFilter::try_new(config.level.as_str())?.add_directive(directive.parse()?);
    Ok(filter)
}

/// Initializes the logging system with the specified configuration.
///
/// `json_format` forces JSON output regardless of the config file.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    info!(
        "🔧 Logging initialized with level: {} (network: {:?})",
        config.level, config.network_log_level
    );
    Ok(())
}

/// Displays the startup banner.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║             🔁 ROOMLOOP 🔁               ║");
    info!("║              client v{}               ║", version);
    info!("║                                          ║");
    info!("║  Frame-driven send and dispatch loop     ║");
    info!("║  for multiplayer room clients            ║");
    info!("╚══════════════════════════════════════════╝");
}
