//! RF amplifier state machines.
//!
//! [`TxAmplifier`] owns the transmit-enable and power-stage lines. An
//! [`RxTxAmplifier`] wraps one and adds the transmit/receive relay, the
//! receive preamplifier and the antenna polarization switch. VHF and UHF
//! are RxTx; L-Band is transmit-only.
//!
//! There is no explicit state enum: the line levels are the state, and each
//! transition checks its own preconditions against them.

use super::{drive, status_line, Device, Outcome};
use crate::allocator::PinAllocator;
use crate::arbiter::TransmitArbiter;
use crate::clock::SharedClock;
use crate::config::InterlockConfig;
use crate::cooldown::CooldownTracker;
use crate::error::{AllocError, GpioError, InterlockError, Result};
use crate::gpio::{state_str, Line, OFF, ON};
use crate::molly_guard::{GuardStatus, GuardTimer};
use crate::protocol::{Component, Verb};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const LEFT: bool = ON;
pub const RIGHT: bool = OFF;

fn pin_label(device: &str, component: Component) -> String {
    format!("{device}_{}", component.as_str()).replace('-', "_")
}

fn polarization_str(level: bool) -> &'static str {
    if level == LEFT {
        "LEFT"
    } else {
        "RIGHT"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxAction {
    RfPttOn,
    RfPttOff,
    PaPowerOn,
    PaPowerOff,
}

impl TxAction {
    pub fn resolve(component: Component, verb: Verb) -> Option<Self> {
        match (component, verb) {
            (Component::RfPtt, Verb::On) => Some(TxAction::RfPttOn),
            (Component::RfPtt, Verb::Off) => Some(TxAction::RfPttOff),
            (Component::PaPower, Verb::On) => Some(TxAction::PaPowerOn),
            (Component::PaPower, Verb::Off) => Some(TxAction::PaPowerOff),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct TxAmplifier {
    name: &'static str,
    rf_ptt: Line,
    pa_power: Line,
    guard: GuardTimer,
    cooldown: CooldownTracker,
    settle: Duration,
    clock: SharedClock,
}

impl TxAmplifier {
    pub fn new(
        name: &'static str,
        rf_ptt: Line,
        pa_power: Line,
        interlock: &InterlockConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            name,
            rf_ptt,
            pa_power,
            guard: GuardTimer::with_window(interlock.guard_window()),
            cooldown: CooldownTracker::with_cooldown(interlock.ptt_cooldown()),
            settle: interlock.settle(),
            clock,
        }
    }

    /// Claim the `{name}_rf_ptt` and `{name}_pa_power` lines.
    pub fn open(
        name: &'static str,
        allocator: &mut PinAllocator,
        interlock: &InterlockConfig,
        clock: SharedClock,
    ) -> std::result::Result<Self, AllocError> {
        let rf_ptt = allocator.acquire(name, &pin_label(name, Component::RfPtt))?;
        let pa_power = allocator.acquire(name, &pin_label(name, Component::PaPower))?;
        Ok(Self::new(name, rf_ptt, pa_power, interlock, clock))
    }

    pub fn is_transmitting(&self) -> std::result::Result<bool, GpioError> {
        self.rf_ptt.read()
    }

    pub fn rf_ptt_on(&mut self, arbiter: &mut TransmitArbiter) -> Result<Outcome> {
        self.key(arbiter, || Ok(()))
    }

    /// Assert transmit-enable. `prepare` runs after every check has passed
    /// and before the settle delay, so variants can route the antenna path
    /// first.
    fn key<F>(&mut self, arbiter: &mut TransmitArbiter, prepare: F) -> Result<Outcome>
    where
        F: FnOnce() -> std::result::Result<(), GpioError>,
    {
        if self.rf_ptt.read()? == ON {
            return Ok(Outcome::NoChange);
        }
        if self.pa_power.read()? == OFF {
            warn!(device = self.name, "Refusing transmit: power amplifier is off");
            return Err(InterlockError::TransmitDisabled);
        }
        if let Err(e) = arbiter.ensure_capacity() {
            warn!(device = self.name, active = arbiter.count(), "Refusing transmit: {e}");
            return Err(e);
        }

        prepare()?;
        self.clock.sleep(self.settle);
        self.rf_ptt.write(ON)?;
        arbiter.increment()?;

        info!(device = self.name, active = arbiter.count(), "Transmit enabled");
        Ok(Outcome::Applied)
    }

    pub fn rf_ptt_off(&mut self, arbiter: &mut TransmitArbiter) -> Result<Outcome> {
        if self.rf_ptt.read()? == OFF {
            return Ok(Outcome::NoChange);
        }

        self.rf_ptt.write(OFF)?;
        self.cooldown.record_disabled(self.clock.now());
        arbiter.decrement();

        info!(device = self.name, active = arbiter.count(), "Transmit disabled");
        Ok(Outcome::Applied)
    }

    pub fn pa_power_on(&mut self) -> Result<Outcome> {
        if self.pa_power.read()? == ON {
            return Ok(Outcome::NoChange);
        }

        if let GuardStatus::AwaitingConfirmation { seconds } =
            self.guard.check_and_arm(self.clock.now())
        {
            info!(device = self.name, seconds, "Power amplifier on awaiting confirmation");
            return Ok(Outcome::AwaitingConfirmation { seconds });
        }

        self.pa_power.write(ON)?;
        info!(device = self.name, "Power amplifier on");
        Ok(Outcome::Applied)
    }

    pub fn pa_power_off(&mut self) -> Result<Outcome> {
        if self.pa_power.read()? == OFF {
            return Ok(Outcome::NoChange);
        }
        if self.rf_ptt.read()? == ON {
            warn!(device = self.name, "Refusing power amplifier off while transmitting");
            return Err(InterlockError::TransmitConflict);
        }

        let now = self.clock.now();
        if !self.cooldown.is_ready(now) {
            let seconds = self.cooldown.seconds_until_ready(now).ceil().max(1.0) as u64;
            debug!(device = self.name, seconds, "Power amplifier off inside cooldown");
            return Err(InterlockError::CooldownNotElapsed { seconds });
        }

        self.pa_power.write(OFF)?;
        info!(device = self.name, "Power amplifier off");
        Ok(Outcome::Applied)
    }
}

impl Device for TxAmplifier {
    type Action = TxAction;

    fn name(&self) -> &'static str {
        self.name
    }

    fn resolve(component: Component, verb: Verb) -> Option<TxAction> {
        TxAction::resolve(component, verb)
    }

    fn execute(&mut self, action: TxAction, arbiter: &mut TransmitArbiter) -> Result<Outcome> {
        match action {
            TxAction::RfPttOn => self.rf_ptt_on(arbiter),
            TxAction::RfPttOff => self.rf_ptt_off(arbiter),
            TxAction::PaPowerOn => self.pa_power_on(),
            TxAction::PaPowerOff => self.pa_power_off(),
        }
    }

    fn device_status(&self) -> Result<String> {
        let mut status = status_line(self.name, Component::RfPtt, state_str(self.rf_ptt.read()?));
        status.push_str(&status_line(
            self.name,
            Component::PaPower,
            state_str(self.pa_power.read()?),
        ));
        Ok(status)
    }

    fn component_status(&self, component: Component) -> Result<String> {
        let line = match component {
            Component::RfPtt => &self.rf_ptt,
            Component::PaPower => &self.pa_power,
            _ => return Err(InterlockError::InvalidComponent),
        };
        Ok(status_line(self.name, component, state_str(line.read()?)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxTxAction {
    Tx(TxAction),
    LnaOn,
    LnaOff,
    PolarizationLeft,
    PolarizationRight,
}

impl RxTxAction {
    pub fn resolve(component: Component, verb: Verb) -> Option<Self> {
        match (component, verb) {
            (Component::Lna, Verb::On) => Some(RxTxAction::LnaOn),
            (Component::Lna, Verb::Off) => Some(RxTxAction::LnaOff),
            (Component::Polarization, Verb::Left) => Some(RxTxAction::PolarizationLeft),
            (Component::Polarization, Verb::Right) => Some(RxTxAction::PolarizationRight),
            _ => TxAction::resolve(component, verb).map(RxTxAction::Tx),
        }
    }
}

#[derive(Debug)]
pub struct RxTxAmplifier {
    tx: TxAmplifier,
    tr_relay: Line,
    lna: Line,
    polarization: Line,
}

impl RxTxAmplifier {
    pub fn new(tx: TxAmplifier, tr_relay: Line, lna: Line, polarization: Line) -> Self {
        Self {
            tx,
            tr_relay,
            lna,
            polarization,
        }
    }

    pub fn open(
        name: &'static str,
        allocator: &mut PinAllocator,
        interlock: &InterlockConfig,
        clock: SharedClock,
    ) -> std::result::Result<Self, AllocError> {
        let tx = TxAmplifier::open(name, allocator, interlock, clock)?;
        let tr_relay = allocator.acquire(name, &pin_label(name, Component::TrRelay))?;
        let lna = allocator.acquire(name, &pin_label(name, Component::Lna))?;
        let polarization = allocator.acquire(name, &pin_label(name, Component::Polarization))?;
        Ok(Self::new(tx, tr_relay, lna, polarization))
    }

    pub fn is_transmitting(&self) -> std::result::Result<bool, GpioError> {
        self.tx.is_transmitting()
    }

    /// Key the transmitter with the relay switched to transmit and the LNA
    /// isolated. Those side effects are silent.
    pub fn rf_ptt_on(&mut self, arbiter: &mut TransmitArbiter) -> Result<Outcome> {
        let Self {
            tx, tr_relay, lna, ..
        } = self;
        let name = tx.name;
        tx.key(arbiter, || {
            drive(tr_relay, ON)?;
            if drive(lna, OFF)? {
                debug!(device = name, "LNA isolated for transmit");
            }
            Ok(())
        })
    }

    pub fn rf_ptt_off(&mut self, arbiter: &mut TransmitArbiter) -> Result<Outcome> {
        let outcome = self.tx.rf_ptt_off(arbiter)?;
        if outcome == Outcome::Applied {
            drive(&mut self.tr_relay, OFF)?;
        }
        Ok(outcome)
    }

    pub fn pa_power_on(&mut self) -> Result<Outcome> {
        let outcome = self.tx.pa_power_on()?;
        if outcome == Outcome::Applied {
            drive(&mut self.tr_relay, ON)?;
        }
        Ok(outcome)
    }

    pub fn pa_power_off(&mut self) -> Result<Outcome> {
        let outcome = self.tx.pa_power_off()?;
        if outcome == Outcome::Applied {
            drive(&mut self.tr_relay, OFF)?;
        }
        Ok(outcome)
    }

    pub fn lna_on(&mut self) -> Result<Outcome> {
        if self.lna.read()? == ON {
            return Ok(Outcome::NoChange);
        }
        if self.tx.is_transmitting()? {
            warn!(device = self.tx.name, "Refusing LNA on while transmitting");
            return Err(InterlockError::TransmitConflict);
        }
        self.lna.write(ON)?;
        info!(device = self.tx.name, "LNA on");
        Ok(Outcome::Applied)
    }

    pub fn lna_off(&mut self) -> Result<Outcome> {
        if self.lna.read()? == OFF {
            return Ok(Outcome::NoChange);
        }
        self.lna.write(OFF)?;
        info!(device = self.tx.name, "LNA off");
        Ok(Outcome::Applied)
    }

    pub fn polarization_left(&mut self) -> Result<Outcome> {
        self.polarize(LEFT)
    }

    pub fn polarization_right(&mut self) -> Result<Outcome> {
        self.polarize(RIGHT)
    }

    fn polarize(&mut self, level: bool) -> Result<Outcome> {
        if self.polarization.read()? == level {
            return Ok(Outcome::NoChange);
        }
        if self.tx.is_transmitting()? {
            warn!(device = self.tx.name, "Refusing polarization change while transmitting");
            return Err(InterlockError::TransmitConflict);
        }
        self.tx.clock.sleep(self.tx.settle);
        self.polarization.write(level)?;
        info!(
            device = self.tx.name,
            polarization = polarization_str(level),
            "Polarization switched"
        );
        Ok(Outcome::Applied)
    }
}

impl Device for RxTxAmplifier {
    type Action = RxTxAction;

    fn name(&self) -> &'static str {
        self.tx.name
    }

    fn resolve(component: Component, verb: Verb) -> Option<RxTxAction> {
        RxTxAction::resolve(component, verb)
    }

    fn execute(&mut self, action: RxTxAction, arbiter: &mut TransmitArbiter) -> Result<Outcome> {
        match action {
            RxTxAction::Tx(TxAction::RfPttOn) => self.rf_ptt_on(arbiter),
            RxTxAction::Tx(TxAction::RfPttOff) => self.rf_ptt_off(arbiter),
            RxTxAction::Tx(TxAction::PaPowerOn) => self.pa_power_on(),
            RxTxAction::Tx(TxAction::PaPowerOff) => self.pa_power_off(),
            RxTxAction::LnaOn => self.lna_on(),
            RxTxAction::LnaOff => self.lna_off(),
            RxTxAction::PolarizationLeft => self.polarization_left(),
            RxTxAction::PolarizationRight => self.polarization_right(),
        }
    }

    fn device_status(&self) -> Result<String> {
        let name = self.tx.name;
        let mut status = self.tx.device_status()?;
        status.push_str(&status_line(
            name,
            Component::TrRelay,
            state_str(self.tr_relay.read()?),
        ));
        status.push_str(&status_line(name, Component::Lna, state_str(self.lna.read()?)));
        status.push_str(&status_line(
            name,
            Component::Polarization,
            polarization_str(self.polarization.read()?),
        ));
        Ok(status)
    }

    fn component_status(&self, component: Component) -> Result<String> {
        let name = self.tx.name;
        match component {
            Component::TrRelay => Ok(status_line(name, component, state_str(self.tr_relay.read()?))),
            Component::Lna => Ok(status_line(name, component, state_str(self.lna.read()?))),
            Component::Polarization => Ok(status_line(
                name,
                component,
                polarization_str(self.polarization.read()?),
            )),
            _ => self.tx.component_status(component),
        }
    }
}
