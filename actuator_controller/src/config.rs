use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    controller::{axis_config::AxisConfig, single_axis::AxisTiming},
    controllers::simulated::config::SimulationConfig,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read configuration file: {source}")]
    ReadError { source: std::io::Error },

    #[error("Failed to parse configuration: {source}")]
    ParseError { source: toml::de::Error },

    #[error("Failed to serialize configuration: {source}")]
    SerializeError { source: toml::ser::Error },

    #[error("Failed to write configuration file: {source}")]
    WriteError { source: std::io::Error },

    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    pub listen_addr: String,
    pub max_connections: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:10001".to_string(),
            max_connections: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    pub tick_period_ms: u64,
    pub idle_timeout_secs: u64,
    pub fault_report_interval_secs: u64,
    pub home_on_startup: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 10,
            idle_timeout_secs: 30,
            fault_report_interval_secs: 30,
            home_on_startup: true,
        }
    }
}

impl ControlConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn axis_timing(&self) -> AxisTiming {
        AxisTiming {
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            fault_report_interval: Duration::from_secs(self.fault_report_interval_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Also write daily rolling log files here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxisEntry {
    #[serde(flatten)]
    pub axis: AxisConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl AxisEntry {
    pub fn new(axis_id: u32, total_range: i32, center_percent: u8) -> Self {
        Self {
            axis: AxisConfig::new(axis_id, total_range, center_percent),
            simulation: SimulationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub axes: Vec<AxisEntry>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let mut axis = AxisEntry::new(1, 65536, 50);
        axis.axis.pulse_channel = 0;
        axis.axis.direction_pin = 12;
        axis.axis.enable_pin = 14;
        axis.axis.sensor_pin = 34;

        Self {
            transport: TransportConfig::default(),
            control: ControlConfig::default(),
            logging: LoggingConfig::default(),
            axes: vec![axis],
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::ValidationError { message };

        if self.axes.is_empty() {
            return Err(invalid("at least one axis must be configured".to_string()));
        }
        if self.control.tick_period_ms == 0 {
            return Err(invalid("tick_period_ms must be positive".to_string()));
        }
        if self.control.idle_timeout_secs == 0 {
            return Err(invalid("idle_timeout_secs must be positive".to_string()));
        }
        if self.control.fault_report_interval_secs == 0 {
            return Err(invalid(
                "fault_report_interval_secs must be positive".to_string(),
            ));
        }
        if self.transport.max_connections == 0 {
            return Err(invalid("max_connections must be positive".to_string()));
        }

        let mut ids = HashSet::new();
        for entry in &self.axes {
            if !ids.insert(entry.axis.axis_id) {
                return Err(invalid(format!("duplicate axis id {}", entry.axis.axis_id)));
            }
            entry.axis.validate().map_err(invalid)?;
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct ConfigOptions {
    pub config_path: PathBuf,
    pub create_if_missing: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            create_if_missing: true,
        }
    }
}

impl ConfigOptions {
    pub fn default_config_path() -> PathBuf {
        std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("default_config.toml"))
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    options: ConfigOptions,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            options: ConfigOptions::default(),
        }
    }

    pub fn with_options(options: ConfigOptions) -> Self {
        Self { options }
    }

    pub fn load(&self) -> anyhow::Result<ControllerConfig> {
        let config_path = &self.options.config_path;

        if !config_path.exists() {
            if self.options.create_if_missing {
                let default_config = ControllerConfig::default();
                self.save(&default_config)
                    .context("Failed to save default config")?;
                return Ok(default_config);
            }

            return Err(ConfigError::FileNotFound {
                path: config_path.clone(),
            }
            .into());
        }

        let content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError { source: e })?;

        let config: ControllerConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError { source: e })?;

        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, config: &ControllerConfig) -> anyhow::Result<()> {
        let config_path = &self.options.config_path;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError { source: e })?;
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(config_path, content).map_err(|e| ConfigError::WriteError { source: e })?;

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_config() -> anyhow::Result<(ConfigManager, ControllerConfig)> {
    let manager = ConfigManager::new();
    let config = manager.load()?;
    Ok((manager, config))
}

pub fn create_default_config<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<()> {
    let config_path = path
        .map(|p| p.as_ref().to_path_buf())
        .unwrap_or_else(ConfigOptions::default_config_path);

    let manager = ConfigManager::with_options(ConfigOptions {
        config_path,
        create_if_missing: true,
    });
    manager.save(&ControllerConfig::default())?;

    Ok(())
}
