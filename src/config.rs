use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::configurator::DEFAULT_SCAN_LIST;
use crate::locator::DeviceLocator;
use crate::stream::{StreamSettings, CHANNEL_COUNT};
use crate::types::{ConnectionType, DeviceType};
use crate::window::DEFAULT_WINDOW_LEN;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub stream: StreamConfig,
    pub display: DisplayConfig,
    pub console: ConsoleConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    /// Device model, e.g. "T4"
    pub model: String,
    /// Transport tried first; "ANY" is the fallback
    pub preferred_connection: String,
    /// Serial number, IP address, device name or "ANY"
    pub identifier: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// Channels in scan order: vibration first, temperature second
    pub scan_list: Vec<String>,
    pub scan_rate: f64,
    pub scans_per_read: usize,
    pub tick_period_ms: u64,
    pub window_len: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConsoleConfig {
    pub verbosity: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: "T4".to_string(),
            preferred_connection: "ETHERNET".to_string(),
            identifier: "ANY".to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        let settings = StreamSettings::default();
        Self {
            scan_list: DEFAULT_SCAN_LIST.iter().map(|s| s.to_string()).collect(),
            scan_rate: settings.scan_rate,
            scans_per_read: settings.scans_per_read,
            tick_period_ms: settings.tick_period.as_millis() as u64,
            window_len: DEFAULT_WINDOW_LEN,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 120,
            height: 24,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            verbosity: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.device
            .model
            .parse::<DeviceType>()
            .map_err(|e| ConfigError::Message(format!("Invalid device.model: {}", e)))?;
        self.device
            .preferred_connection
            .parse::<ConnectionType>()
            .map_err(|e| {
                ConfigError::Message(format!("Invalid device.preferred_connection: {}", e))
            })?;

        if self.stream.scan_list.len() != CHANNEL_COUNT {
            return Err(ConfigError::Message(format!(
                "stream.scan_list must name {} channels (vibration, temperature), got {}",
                CHANNEL_COUNT,
                self.stream.scan_list.len()
            )));
        }
        if !self.stream.scan_rate.is_finite() || self.stream.scan_rate <= 0.0 {
            return Err(ConfigError::Message(format!(
                "stream.scan_rate must be a positive number, got {}",
                self.stream.scan_rate
            )));
        }
        if self.stream.scans_per_read == 0 {
            return Err(ConfigError::Message(
                "stream.scans_per_read must be at least 1".to_string(),
            ));
        }
        if self.stream.tick_period_ms == 0 {
            return Err(ConfigError::Message(
                "stream.tick_period_ms must be at least 1".to_string(),
            ));
        }
        if self.stream.window_len == 0 {
            return Err(ConfigError::Message(
                "stream.window_len must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn locator(&self) -> Result<DeviceLocator, ConfigError> {
        let device_type = self
            .device
            .model
            .parse::<DeviceType>()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        let preferred_connection = self
            .device
            .preferred_connection
            .parse::<ConnectionType>()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(DeviceLocator::new(
            device_type,
            preferred_connection,
            self.device.identifier.clone(),
        ))
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            scan_rate: self.stream.scan_rate,
            scans_per_read: self.stream.scans_per_read,
            window_len: self.stream.window_len,
            tick_period: Duration::from_millis(self.stream.tick_period_ms),
        }
    }
}

/// Load configuration from file with layered fallbacks
///
/// Defaults, then the given file (or `lj-diag.toml` in the working directory
/// when present), then `LJ_DIAG__SECTION__KEY` environment overrides.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(ConfigError::Message(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    } else if Path::new("lj-diag.toml").exists() {
        builder = builder.add_source(File::with_name("lj-diag.toml"));
    }

    builder = builder.add_source(
        Environment::with_prefix("LJ_DIAG")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}
