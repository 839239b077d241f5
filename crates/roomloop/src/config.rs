//! Configuration management for the room client.
//!
//! This module handles loading, validation, and conversion of client
//! configuration from TOML files and command-line arguments.

use roomloop_core::{ConnectionStrategy, DriverConfig, NetworkLogLevel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_frame_interval_ms() -> u64 {
    16 // ~60 frames per second
}

fn default_fixed_timestep_ms() -> u64 {
    20
}

fn default_time_scale() -> f32 {
    1.0
}

fn default_stats_interval_secs() -> u64 {
    30
}

fn default_connection_strategy() -> ConnectionStrategy {
    ConnectionStrategy::ToBest
}

fn default_auto_sync_scene() -> bool {
    true
}

fn default_scene_name() -> String {
    "Lobby".to_string()
}

fn default_room_name() -> String {
    "roomloop".to_string()
}

fn default_nickname() -> String {
    "Player".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Update driver rates and caps
    #[serde(default)]
    pub driver: DriverConfig,
    /// Simulated host engine frame timing
    #[serde(default)]
    pub host: HostSettings,
    /// Room session settings
    #[serde(default)]
    pub session: SessionSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Frame timing of the host loop that ticks the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Time between rendered frames (late updates)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Simulation step between fixed updates
    #[serde(default = "default_fixed_timestep_ms")]
    pub fixed_timestep_ms: u64,
    /// Scale applied to simulated time; 0 pauses fixed updates
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    /// Seconds between statistics reports
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            fixed_timestep_ms: default_fixed_timestep_ms(),
            time_scale: default_time_scale(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

/// Room session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// How the peer picks the server it connects to
    #[serde(default = "default_connection_strategy")]
    pub connection_strategy: ConnectionStrategy,
    /// Whether non-master clients follow the master's scene
    #[serde(default = "default_auto_sync_scene")]
    pub auto_sync_scene: bool,
    /// Scene loaded at startup
    #[serde(default = "default_scene_name")]
    pub scene_name: String,
    #[serde(default = "default_room_name")]
    pub room_name: String,
    #[serde(default = "default_nickname")]
    pub nickname: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connection_strategy: default_connection_strategy(),
            auto_sync_scene: default_auto_sync_scene(),
            scene_name: default_scene_name(),
            room_name: default_room_name(),
            nickname: default_nickname(),
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to use JSON format for logs
    #[serde(default)]
    pub json_format: bool,
    /// Verbosity of the networking core
    #[serde(default)]
    pub network_log_level: NetworkLogLevel,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            network_log_level: NetworkLogLevel::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// The driver configuration to build the update driver from.
    pub fn to_driver_config(&self) -> DriverConfig {
        self.driver.clone()
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        self.driver.validate().map_err(|e| e.to_string())?;

        if self.host.frame_interval_ms == 0 {
            return Err("host.frame_interval_ms must be greater than 0".to_string());
        }
        if self.host.fixed_timestep_ms == 0 {
            return Err("host.fixed_timestep_ms must be greater than 0".to_string());
        }
        if !self.host.time_scale.is_finite() || self.host.time_scale < 0.0 {
            return Err(format!(
                "host.time_scale must be a non-negative number, got {}",
                self.host.time_scale
            ));
        }
        if self.host.stats_interval_secs == 0 {
            return Err("host.stats_interval_secs must be greater than 0".to_string());
        }

        if self.session.scene_name.is_empty() {
            return Err("session.scene_name cannot be empty".to_string());
        }
        if self.session.room_name.is_empty() {
            return Err("session.room_name cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.driver.send_rate, 30);
        assert_eq!(config.driver.serialization_rate, 10);
        assert_eq!(config.driver.max_datagrams, 10);
        assert_eq!(config.host.frame_interval_ms, 16);
        assert_eq!(config.host.fixed_timestep_ms, 20);
        assert_eq!(config.host.time_scale, 1.0);
        assert_eq!(config.session.connection_strategy, ConnectionStrategy::ToBest);
        assert!(config.session.auto_sync_scene);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.network_log_level, NetworkLogLevel::ErrorsOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.driver.send_rate = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.host.frame_interval_ms = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.host.time_scale = -0.5;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.session.scene_name.clear();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file_creates_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.driver.send_rate, 30);
        assert!(path.exists());

        // The written file loads back to the same settings
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.session.scene_name, "Lobby");
        assert_eq!(reloaded.driver.max_dispatch_per_tick, 1000);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[driver]
send_rate = 20
serialization_rate = 5
max_datagrams = 4

[host]
frame_interval_ms = 33
time_scale = 0.5

[session]
connection_strategy = "to_region"
auto_sync_scene = false
scene_name = "Arena"
nickname = "tester"

[logging]
level = "debug"
json_format = true
network_log_level = "full"
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(&temp_file.path().to_path_buf())
            .await
            .unwrap();

        assert_eq!(config.driver.send_rate, 20);
        assert_eq!(config.driver.serialization_rate, 5);
        assert_eq!(config.driver.max_datagrams, 4);
        assert_eq!(config.driver.max_dispatch_per_tick, 1000);
        assert_eq!(config.host.frame_interval_ms, 33);
        assert_eq!(config.host.fixed_timestep_ms, 20);
        assert_eq!(config.host.time_scale, 0.5);
        assert_eq!(config.session.connection_strategy, ConnectionStrategy::ToRegion);
        assert!(!config.session.auto_sync_scene);
        assert_eq!(config.session.scene_name, "Arena");
        assert_eq!(config.session.room_name, "roomloop");
        assert_eq!(config.session.nickname, "tester");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.logging.network_log_level, NetworkLogLevel::Full);

        let driver = config.to_driver_config();
        assert_eq!(driver.send_interval_ms(), 50);
        assert_eq!(driver.serialize_interval_ms(), 200);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[driver\nsend_rate = ").await.unwrap();

        let result = AppConfig::load_from_file(&temp_file.path().to_path_buf()).await;
        assert!(result.is_err());
    }
}
