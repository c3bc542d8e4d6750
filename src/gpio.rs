//! Binary output lines.
//!
//! Every controllable component of the station is a single GPIO line driven
//! high (on) or low (off). [`SysfsLine`] drives real pins through the Linux
//! sysfs interface; [`SimulatedLine`] keeps the level in memory for bench
//! runs and tests.

use crate::error::GpioError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const ON: bool = true;
pub const OFF: bool = false;

/// An output line owned by exactly one device.
pub trait GpioLine: Send + fmt::Debug {
    fn label(&self) -> &str;

    fn read(&self) -> Result<bool, GpioError>;

    fn write(&mut self, level: bool) -> Result<(), GpioError>;
}

pub type Line = Box<dyn GpioLine>;

pub fn state_str(level: bool) -> &'static str {
    if level {
        "ON"
    } else {
        "OFF"
    }
}

/// A pin exported through `/sys/class/gpio`.
#[derive(Debug)]
pub struct SysfsLine {
    label: String,
    pin: u32,
    value_path: PathBuf,
}

impl SysfsLine {
    /// Export `pin` under `root` and make sure it is an output.
    ///
    /// The current level is preserved: the direction is written as `high`
    /// or `low` rather than `out`, so a line that was keyed before a daemon
    /// restart stays keyed.
    pub fn open(root: &Path, label: &str, pin: u32) -> Result<Self, GpioError> {
        let pin_dir = root.join(format!("gpio{pin}"));
        if !pin_dir.exists() {
            let export = root.join("export");
            fs::write(&export, pin.to_string()).map_err(|source| GpioError::Io {
                label: label.to_string(),
                path: export,
                source,
            })?;
        }

        let line = Self {
            label: label.to_string(),
            pin,
            value_path: pin_dir.join("value"),
        };

        let direction_path = pin_dir.join("direction");
        let direction = line.read_file(&direction_path)?;
        if direction != "out" {
            let level = line.read()?;
            let direction = if level { "high" } else { "low" };
            line.write_file(&direction_path, direction)?;
            tracing::debug!(label, pin, direction, "Asserted output direction");
        }

        Ok(line)
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn read_file(&self, path: &Path) -> Result<String, GpioError> {
        fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .map_err(|source| GpioError::Io {
                label: self.label.clone(),
                path: path.to_path_buf(),
                source,
            })
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<(), GpioError> {
        fs::write(path, contents).map_err(|source| GpioError::Io {
            label: self.label.clone(),
            path: path.to_path_buf(),
            source,
        })
    }
}

impl GpioLine for SysfsLine {
    fn label(&self) -> &str {
        &self.label
    }

    fn read(&self) -> Result<bool, GpioError> {
        match self.read_file(&self.value_path)?.as_str() {
            "1" => Ok(ON),
            "0" => Ok(OFF),
            other => Err(GpioError::InvalidValue {
                label: self.label.clone(),
                value: other.to_string(),
            }),
        }
    }

    fn write(&mut self, level: bool) -> Result<(), GpioError> {
        self.write_file(&self.value_path, if level { "1" } else { "0" })
    }
}

/// In-memory pin state shared between a [`SimulatedLine`] and whoever
/// inspects it.
#[derive(Debug, Default)]
pub struct SimulatedPin {
    level: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl SimulatedPin {
    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    /// Force the level without counting it as a write, e.g. to model a line
    /// left keyed by a previous daemon.
    pub fn set_level(&self, level: bool) {
        self.level.store(level, Ordering::SeqCst);
    }

    /// Make every subsequent write fail until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct SimulatedLine {
    label: String,
    pin: Arc<SimulatedPin>,
}

impl SimulatedLine {
    pub fn new(label: &str, pin: Arc<SimulatedPin>) -> Self {
        Self {
            label: label.to_string(),
            pin,
        }
    }
}

impl GpioLine for SimulatedLine {
    fn label(&self) -> &str {
        &self.label
    }

    fn read(&self) -> Result<bool, GpioError> {
        Ok(self.pin.level())
    }

    fn write(&mut self, level: bool) -> Result<(), GpioError> {
        if self.pin.fail_writes.load(Ordering::SeqCst) {
            return Err(GpioError::Faulted {
                label: self.label.clone(),
            });
        }
        self.pin.writes.fetch_add(1, Ordering::SeqCst);
        self.pin.set_level(level);
        Ok(())
    }
}
