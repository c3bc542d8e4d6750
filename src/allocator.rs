//! Pin ownership bookkeeping.
//!
//! Each physical pin may back exactly one logical line. The allocator maps
//! configured labels to pins, refuses to hand a pin to a second owner, and
//! opens the line through the configured backend.

use crate::config::{GpioBackend, StationConfig};
use crate::error::AllocError;
use crate::gpio::{Line, SimulatedLine, SimulatedPin, SysfsLine};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Allocation {
    device: String,
    label: String,
}

#[derive(Debug)]
pub struct PinAllocator {
    pins: BTreeMap<String, u32>,
    backend: GpioBackend,
    sysfs_root: PathBuf,
    allocated: HashMap<u32, Allocation>,
    simulated: HashMap<u32, Arc<SimulatedPin>>,
}

impl PinAllocator {
    pub fn new(config: &StationConfig) -> Self {
        Self {
            pins: config.pins.clone(),
            backend: config.gpio.backend,
            sysfs_root: config.gpio.sysfs_root.clone(),
            allocated: HashMap::new(),
            simulated: HashMap::new(),
        }
    }

    /// Hand the line for `label` to `device`.
    ///
    /// Asking again for a pin the same device already holds returns a fresh
    /// handle to it; asking for a pin held by anyone else fails.
    pub fn acquire(&mut self, device: &str, label: &str) -> Result<Line, AllocError> {
        let pin = *self.pins.get(label).ok_or_else(|| AllocError::UnknownLabel {
            label: label.to_string(),
        })?;

        let request = Allocation {
            device: device.to_string(),
            label: label.to_string(),
        };

        match self.allocated.get(&pin) {
            Some(existing) if *existing == request => {
                warn!(pin, label, device, "Pin already in use by this device");
            }
            Some(existing) => {
                return Err(AllocError::Conflict {
                    pin,
                    label: label.to_string(),
                    owner: existing.device.clone(),
                });
            }
            None => {
                self.allocated.insert(pin, request);
                info!(pin, label, device, backend = ?self.backend, "Allocated pin");
            }
        }

        self.open(label, pin)
    }

    fn open(&mut self, label: &str, pin: u32) -> Result<Line, AllocError> {
        match self.backend {
            GpioBackend::Sysfs => SysfsLine::open(&self.sysfs_root, label, pin)
                .map(|line| Box::new(line) as Line)
                .map_err(|source| AllocError::Line {
                    label: label.to_string(),
                    source,
                }),
            GpioBackend::Simulated => {
                let state = Arc::clone(self.simulated.entry(pin).or_default());
                Ok(Box::new(SimulatedLine::new(label, state)))
            }
        }
    }

    /// The in-memory state behind a simulated line, if one was opened.
    pub fn simulated_pin(&self, label: &str) -> Option<Arc<SimulatedPin>> {
        let pin = self.pins.get(label)?;
        self.simulated.get(pin).cloned()
    }

    pub fn owner_of(&self, pin: u32) -> Option<&str> {
        self.allocated.get(&pin).map(|a| a.device.as_str())
    }
}
