pub mod accessory;
pub mod amplifier;

pub use accessory::{Accessory, AccessoryAction, AccessoryKind};
pub use amplifier::{RxTxAction, RxTxAmplifier, TxAction, TxAmplifier};

use crate::arbiter::TransmitArbiter;
use crate::error::{GpioError, Result};
use crate::gpio::Line;
use crate::protocol::{Component, Verb};

/// What a successful state-machine call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The line was already at the requested level; nothing was touched.
    NoChange,
    /// First half of a guarded action; repeat it within `seconds`.
    AwaitingConfirmation { seconds: u64 },
}

/// A station device addressable by the command router.
///
/// Each family has its own closed action type, so an operation a device
/// lacks cannot be expressed for it at all.
pub trait Device {
    type Action: Copy + std::fmt::Debug;

    fn name(&self) -> &'static str;

    fn resolve(component: Component, verb: Verb) -> Option<Self::Action>
    where
        Self: Sized;

    fn execute(&mut self, action: Self::Action, arbiter: &mut TransmitArbiter) -> Result<Outcome>;

    fn device_status(&self) -> Result<String>;

    fn component_status(&self, component: Component) -> Result<String>;
}

/// Drive `line` to `level` if it is not already there. Returns whether a
/// write happened.
pub(crate) fn drive(line: &mut Line, level: bool) -> std::result::Result<bool, GpioError> {
    if line.read()? == level {
        return Ok(false);
    }
    line.write(level)?;
    Ok(true)
}

pub(crate) fn status_line(device: &str, component: Component, state: &str) -> String {
    format!("{device} {} {state}\n", component.as_str())
}
