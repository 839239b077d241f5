//! # Roomloop Client - Main Entry Point
//!
//! Runs a room client whose network peer is ticked from a simulated host frame
//! loop. This entry point handles CLI parsing, configuration loading, logging
//! setup and application lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! roomloop
//!
//! # Specify custom configuration
//! roomloop --config client.toml
//!
//! # Override specific settings
//! roomloop --send-rate 20 --serialization-rate 5 --log-level debug
//!
//! # JSON logging
//! roomloop --json-logs
//! ```
//!
//! ## Configuration
//!
//! The client loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The frame loop stops on SIGINT (Ctrl+C) and SIGTERM (Unix systems).

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod host;
pub mod logging;
pub mod loopback;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the roomloop client.
///
/// Exits the process with code 1 when startup or the frame loop fails.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{HostSettings, LoggingSettings, SessionSettings};
pub use loopback::LoopbackPeer;
