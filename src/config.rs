//! Daemon configuration.
//!
//! Loaded from a TOML file. Every section is optional and falls back to the
//! defaults below, which match the station's wiring harness.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:5005";
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";
pub const DEFAULT_TEMPERATURE_PATH: &str =
    "/sys/bus/i2c/drivers/adt7410/1-004a/hwmon/hwmon2/temp1_input";

pub const MAX_ACTIVE_TX: usize = 1;
pub const GUARD_WINDOW_SECS: u64 = 20;
pub const PTT_COOLDOWN_SECS: u64 = 120;
pub const SETTLE_MS: u64 = 100;

/// Every logical line the station needs, as `{device}_{component}`.
pub const REQUIRED_PINS: [&str; 17] = [
    "vhf_rf_ptt",
    "vhf_pa_power",
    "vhf_tr_relay",
    "vhf_lna",
    "vhf_polarization",
    "uhf_rf_ptt",
    "uhf_pa_power",
    "uhf_tr_relay",
    "uhf_lna",
    "uhf_polarization",
    "l_band_rf_ptt",
    "l_band_pa_power",
    "vu_tx_relay_power",
    "satnogs_host_power",
    "radio_host_power",
    "rotator_power",
    "sdr_b200_power",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub network: NetworkConfig,
    pub interlock: InterlockConfig,
    pub gpio: GpioConfig,
    /// Logical line label to physical pin number.
    pub pins: BTreeMap<String, u32>,
    pub sensor: SensorConfig,
    pub logging: LoggingConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            interlock: InterlockConfig::default(),
            gpio: GpioConfig::default(),
            pins: default_pins(),
            sensor: SensorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterlockConfig {
    pub max_active_tx: usize,
    pub guard_window_secs: u64,
    pub ptt_cooldown_secs: u64,
    pub settle_ms: u64,
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self {
            max_active_tx: MAX_ACTIVE_TX,
            guard_window_secs: GUARD_WINDOW_SECS,
            ptt_cooldown_secs: PTT_COOLDOWN_SECS,
            settle_ms: SETTLE_MS,
        }
    }
}

impl InterlockConfig {
    pub fn guard_window(&self) -> Duration {
        Duration::from_secs(self.guard_window_secs)
    }

    pub fn ptt_cooldown(&self) -> Duration {
        Duration::from_secs(self.ptt_cooldown_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackend {
    #[default]
    Sysfs,
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub backend: GpioBackend,
    pub sysfs_root: PathBuf,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            backend: GpioBackend::Sysfs,
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub temperature_path: Option<PathBuf>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            temperature_path: Some(PathBuf::from(DEFAULT_TEMPERATURE_PATH)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Write the activity log here instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

fn default_pins() -> BTreeMap<String, u32> {
    [
        ("vhf_tr_relay", 17),
        ("vhf_rf_ptt", 18),
        ("vhf_pa_power", 27),
        ("vhf_lna", 22),
        ("vhf_polarization", 23),
        ("uhf_tr_relay", 5),
        ("uhf_rf_ptt", 6),
        ("uhf_pa_power", 12),
        ("uhf_lna", 13),
        ("uhf_polarization", 16),
        ("l_band_rf_ptt", 24),
        ("l_band_pa_power", 25),
        ("vu_tx_relay_power", 26),
        ("satnogs_host_power", 19),
        ("radio_host_power", 20),
        ("rotator_power", 21),
        ("sdr_b200_power", 11),
    ]
    .into_iter()
    .map(|(label, pin)| (label.to_string(), pin))
    .collect()
}

impl StationConfig {
    /// Defaults with every line simulated in memory.
    pub fn simulated() -> Self {
        let mut config = Self::default();
        config.simulate();
        config
    }

    /// Swap in the in-memory backend. The temperature sensor goes too, since
    /// a simulated station has no hwmon file to read.
    pub fn simulate(&mut self) {
        self.gpio.backend = GpioBackend::Simulated;
        self.sensor.temperature_path = None;
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.network
            .bind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("network.bind '{}': {e}", self.network.bind)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.interlock.max_active_tx == 0 {
            return Err(ConfigError::Invalid(
                "interlock.max_active_tx must be at least 1".into(),
            ));
        }
        if self.interlock.guard_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "interlock.guard_window_secs must be non-zero".into(),
            ));
        }
        if self.interlock.ptt_cooldown_secs == 0 {
            return Err(ConfigError::Invalid(
                "interlock.ptt_cooldown_secs must be non-zero".into(),
            ));
        }

        if let Some(missing) = REQUIRED_PINS
            .iter()
            .find(|label| !self.pins.contains_key(**label))
        {
            return Err(ConfigError::Invalid(format!("pins.{missing} is not set")));
        }

        let mut owners: HashMap<u32, &str> = HashMap::new();
        for (label, pin) in &self.pins {
            if let Some(previous) = owners.insert(*pin, label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "pin {pin} is assigned to both '{previous}' and '{label}'"
                )));
            }
        }

        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::Invalid(format!(
                "logging.level '{}' is not a log level",
                self.logging.level
            )));
        }

        Ok(())
    }
}
