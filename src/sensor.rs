//! Board temperature read-out from a hwmon millidegree file.

use crate::error::GpioError;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const LABEL: &str = "temperature";

#[derive(Debug, Clone)]
pub struct TemperatureSensor {
    path: PathBuf,
}

impl TemperatureSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Degrees Celsius.
    pub fn read_celsius(&self) -> Result<f64, GpioError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| GpioError::Io {
            label: LABEL.to_string(),
            path: self.path.clone(),
            source,
        })?;
        let millidegrees: i64 = raw.trim().parse().map_err(|_| GpioError::InvalidValue {
            label: LABEL.to_string(),
            value: raw.trim().to_string(),
        })?;
        let celsius = millidegrees as f64 / 1000.0;
        debug!(celsius, "Read board temperature");
        Ok(celsius)
    }
}
