/// Update driver configuration
use crate::error::DriverError;
use serde::{Deserialize, Serialize};

fn default_send_rate() -> u32 { 30 }
fn default_serialization_rate() -> u32 { 10 }
fn default_max_datagrams() -> usize { 10 }
fn default_max_dispatch_per_tick() -> usize { 1000 }
fn default_min_time_scale() -> f32 { -1.0 }

/// Rates and caps that shape how the driver pumps the peer.
///
/// Rates are per second; the driver converts them to whole-millisecond
/// intervals with integer division (`1000 / rate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Outgoing flushes per second
    #[serde(default = "default_send_rate")]
    pub send_rate: u32,
    /// State sync passes per second
    #[serde(default = "default_serialization_rate")]
    pub serialization_rate: u32,
    /// Upper bound of datagrams flushed in one late update
    #[serde(default = "default_max_datagrams")]
    pub max_datagrams: usize,
    /// Upper bound of inbound batches dispatched in one pass
    #[serde(default = "default_max_dispatch_per_tick")]
    pub max_dispatch_per_tick: usize,
    /// Milliseconds subtracted from each serialization deadline so that a
    /// pass landing slightly before the ideal frame still fires
    #[serde(default)]
    pub serialize_frame_correction_ms: u64,
    /// Late updates also dispatch while the host time scale is at or below
    /// this value. The default never matches.
    #[serde(default = "default_min_time_scale")]
    pub min_time_scale_to_dispatch_in_fixed_update: f32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            send_rate: default_send_rate(),
            serialization_rate: default_serialization_rate(),
            max_datagrams: default_max_datagrams(),
            max_dispatch_per_tick: default_max_dispatch_per_tick(),
            serialize_frame_correction_ms: 0,
            min_time_scale_to_dispatch_in_fixed_update: default_min_time_scale(),
        }
    }
}

impl DriverConfig {
    /// Milliseconds between outgoing flushes.
    pub fn send_interval_ms(&self) -> u64 {
        1000 / u64::from(self.send_rate.max(1))
    }

    /// Milliseconds between state sync passes.
    pub fn serialize_interval_ms(&self) -> u64 {
        1000 / u64::from(self.serialization_rate.max(1))
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        validate_rate("send_rate", self.send_rate)?;
        validate_rate("serialization_rate", self.serialization_rate)?;

        if self.max_datagrams == 0 {
            return Err(DriverError::InvalidConfiguration(
                "max_datagrams must be greater than 0".to_string(),
            ));
        }
        if self.max_dispatch_per_tick == 0 {
            return Err(DriverError::InvalidConfiguration(
                "max_dispatch_per_tick must be greater than 0".to_string(),
            ));
        }
        if self.serialize_frame_correction_ms >= self.serialize_interval_ms() {
            return Err(DriverError::InvalidConfiguration(format!(
                "serialize_frame_correction_ms ({}) must be smaller than the serialization interval ({} ms)",
                self.serialize_frame_correction_ms,
                self.serialize_interval_ms()
            )));
        }
        Ok(())
    }
}

pub(super) fn validate_rate(name: &str, rate: u32) -> Result<(), DriverError> {
    if rate == 0 || rate > 1000 {
        return Err(DriverError::InvalidConfiguration(format!(
            "{name} must be between 1 and 1000 per second, got {rate}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals() {
        let config = DriverConfig::default();
        assert_eq!(config.send_interval_ms(), 33);
        assert_eq!(config.serialize_interval_ms(), 100);
        assert_eq!(config.max_datagrams, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = DriverConfig { send_rate: 0, ..DriverConfig::default() };
        assert!(config.validate().is_err());

        config = DriverConfig { max_datagrams: 0, ..DriverConfig::default() };
        assert!(config.validate().is_err());

        config = DriverConfig { max_dispatch_per_tick: 0, ..DriverConfig::default() };
        assert!(config.validate().is_err());

        config = DriverConfig { serialization_rate: 1001, ..DriverConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_oversized_correction() {
        let config = DriverConfig {
            serialization_rate: 10,
            serialize_frame_correction_ms: 100,
            ..DriverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_fills_defaults() {
        let config: DriverConfig = serde_json::from_str(r#"{"send_rate": 20}"#).unwrap();
        assert_eq!(config.send_rate, 20);
        assert_eq!(config.serialization_rate, 10);
        assert_eq!(config.min_time_scale_to_dispatch_in_fixed_update, -1.0);
    }
}
