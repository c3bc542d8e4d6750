//! Single-line powered accessories.

use super::{status_line, Device, Outcome};
use crate::allocator::PinAllocator;
use crate::arbiter::TransmitArbiter;
use crate::error::{AllocError, InterlockError, Result};
use crate::gpio::{state_str, Line, OFF, ON};
use crate::protocol::{Component, Verb};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryKind {
    Plain,
    /// Switches the shared antenna path; refused while anything transmits.
    TransmitPathRelay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryAction {
    PowerOn,
    PowerOff,
}

impl AccessoryAction {
    pub fn resolve(component: Component, verb: Verb) -> Option<Self> {
        match (component, verb) {
            (Component::Power, Verb::On) => Some(AccessoryAction::PowerOn),
            (Component::Power, Verb::Off) => Some(AccessoryAction::PowerOff),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Accessory {
    name: &'static str,
    kind: AccessoryKind,
    power: Line,
}

impl Accessory {
    pub fn new(name: &'static str, kind: AccessoryKind, power: Line) -> Self {
        Self { name, kind, power }
    }

    /// Claim the `{name}_power` line.
    pub fn open(
        name: &'static str,
        kind: AccessoryKind,
        allocator: &mut PinAllocator,
    ) -> std::result::Result<Self, AllocError> {
        let label = format!("{}_power", name.replace('-', "_"));
        let power = allocator.acquire(name, &label)?;
        Ok(Self::new(name, kind, power))
    }

    pub fn kind(&self) -> AccessoryKind {
        self.kind
    }

    pub fn power_on(&mut self, arbiter: &TransmitArbiter) -> Result<Outcome> {
        self.switch(ON, arbiter)
    }

    pub fn power_off(&mut self, arbiter: &TransmitArbiter) -> Result<Outcome> {
        self.switch(OFF, arbiter)
    }

    fn switch(&mut self, level: bool, arbiter: &TransmitArbiter) -> Result<Outcome> {
        // The relay is checked before the no-change test: while transmitting
        // it is refused even when already at the requested level.
        if self.kind == AccessoryKind::TransmitPathRelay && arbiter.is_transmitting() {
            warn!(
                device = self.name,
                active = arbiter.count(),
                "Refusing antenna path switch while transmitting"
            );
            return Err(InterlockError::TransmitConflict);
        }
        if self.power.read()? == level {
            return Ok(Outcome::NoChange);
        }
        self.power.write(level)?;
        info!(device = self.name, power = state_str(level), "Accessory power switched");
        Ok(Outcome::Applied)
    }
}

impl Device for Accessory {
    type Action = AccessoryAction;

    fn name(&self) -> &'static str {
        self.name
    }

    fn resolve(component: Component, verb: Verb) -> Option<AccessoryAction> {
        AccessoryAction::resolve(component, verb)
    }

    fn execute(&mut self, action: AccessoryAction, arbiter: &mut TransmitArbiter) -> Result<Outcome> {
        match action {
            AccessoryAction::PowerOn => self.power_on(arbiter),
            AccessoryAction::PowerOff => self.power_off(arbiter),
        }
    }

    fn device_status(&self) -> Result<String> {
        self.component_status(Component::Power)
    }

    fn component_status(&self, component: Component) -> Result<String> {
        if component != Component::Power {
            return Err(InterlockError::InvalidComponent);
        }
        Ok(status_line(self.name, component, state_str(self.power.read()?)))
    }
}
