//! The station: every device, the shared transmit arbiter, and the command
//! router in front of them.
//!
//! A `Station` is only ever used through `&mut self`. The server keeps it
//! behind one lock, so each command runs its checks and line writes without
//! interleaving with any other.

use crate::allocator::PinAllocator;
use crate::arbiter::TransmitArbiter;
use crate::clock::SharedClock;
use crate::config::StationConfig;
use crate::devices::{Accessory, AccessoryKind, Device, RxTxAmplifier, TxAmplifier};
use crate::error::{DaemonError, GpioError, InterlockError, Result};
use crate::protocol::{Command, DeviceId, Reply, Request, Target};
use crate::sensor::TemperatureSensor;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub struct Station {
    arbiter: TransmitArbiter,
    vhf: RxTxAmplifier,
    uhf: RxTxAmplifier,
    l_band: TxAmplifier,
    vu_tx_relay: Accessory,
    satnogs_host: Accessory,
    radio_host: Accessory,
    rotator: Accessory,
    sdr_b200: Accessory,
    sensor: Option<TemperatureSensor>,
}

impl Station {
    /// Claim every configured line and seed the arbiter from whatever is
    /// already keyed.
    pub fn open(
        config: &StationConfig,
        allocator: &mut PinAllocator,
        clock: SharedClock,
    ) -> std::result::Result<Self, DaemonError> {
        let interlock = &config.interlock;
        let mut station = Self {
            arbiter: TransmitArbiter::with_limit(interlock.max_active_tx),
            vhf: RxTxAmplifier::open("vhf", allocator, interlock, Arc::clone(&clock))?,
            uhf: RxTxAmplifier::open("uhf", allocator, interlock, Arc::clone(&clock))?,
            l_band: TxAmplifier::open("l-band", allocator, interlock, clock)?,
            vu_tx_relay: Accessory::open("vu-tx-relay", AccessoryKind::TransmitPathRelay, allocator)?,
            satnogs_host: Accessory::open("satnogs-host", AccessoryKind::Plain, allocator)?,
            radio_host: Accessory::open("radio-host", AccessoryKind::Plain, allocator)?,
            rotator: Accessory::open("rotator", AccessoryKind::Plain, allocator)?,
            sdr_b200: Accessory::open("sdr-b200", AccessoryKind::Plain, allocator)?,
            sensor: config
                .sensor
                .temperature_path
                .clone()
                .map(TemperatureSensor::new),
        };
        station.reconcile()?;
        Ok(station)
    }

    fn reconcile(&mut self) -> std::result::Result<(), GpioError> {
        let keyed = [
            self.vhf.is_transmitting()?,
            self.uhf.is_transmitting()?,
            self.l_band.is_transmitting()?,
        ]
        .into_iter()
        .filter(|keyed| *keyed)
        .count();

        if keyed > 0 {
            warn!(keyed, "Transmitters already keyed at startup");
        }
        self.arbiter.reconcile(keyed);
        info!(
            active = self.arbiter.count(),
            max = self.arbiter.limit(),
            "Station ready"
        );
        Ok(())
    }

    pub fn arbiter(&self) -> &TransmitArbiter {
        &self.arbiter
    }

    /// Run one datagram to completion and produce its reply.
    pub fn handle(&mut self, datagram: &str) -> Reply {
        let command = match Command::parse_datagram(datagram) {
            Ok(command) => command,
            Err(e) => {
                warn!(datagram = datagram.trim(), "Rejected command: {e}");
                return Reply::Invalid;
            }
        };

        match self.dispatch(&command) {
            Ok(reply) => {
                debug!(command = %command.text, "Handled");
                reply
            }
            Err(e @ InterlockError::Hardware(_)) => {
                error!(command = %command.text, "Hardware fault: {e}");
                Reply::from_error(&command.text, &e)
            }
            Err(e) => {
                warn!(command = %command.text, "Refused: {e}");
                Reply::from_error(&command.text, &e)
            }
        }
    }

    pub fn dispatch(&mut self, command: &Command) -> Result<Reply> {
        let (device, request) = match command.target {
            Target::Temperature => {
                let sensor = self
                    .sensor
                    .as_ref()
                    .ok_or(InterlockError::InvalidCommand)?;
                return Ok(Reply::Temperature(sensor.read_celsius()?));
            }
            Target::Device { device, request } => (device, request),
        };

        let Self {
            arbiter,
            vhf,
            uhf,
            l_band,
            vu_tx_relay,
            satnogs_host,
            radio_host,
            rotator,
            sdr_b200,
            ..
        } = self;
        let text = command.text.as_str();

        match device {
            DeviceId::Vhf => route(vhf, arbiter, text, request),
            DeviceId::Uhf => route(uhf, arbiter, text, request),
            DeviceId::LBand => route(l_band, arbiter, text, request),
            DeviceId::VuTxRelay => route(vu_tx_relay, arbiter, text, request),
            DeviceId::SatnogsHost => route(satnogs_host, arbiter, text, request),
            DeviceId::RadioHost => route(radio_host, arbiter, text, request),
            DeviceId::Rotator => route(rotator, arbiter, text, request),
            DeviceId::SdrB200 => route(sdr_b200, arbiter, text, request),
        }
    }
}

fn route<D: Device>(
    device: &mut D,
    arbiter: &mut TransmitArbiter,
    text: &str,
    request: Request,
) -> Result<Reply> {
    match request {
        Request::DeviceStatus => Ok(Reply::Status(device.device_status()?)),
        Request::ComponentStatus(component) => {
            Ok(Reply::Status(device.component_status(component)?))
        }
        Request::Action(component, verb) => {
            let action = D::resolve(component, verb).ok_or(InterlockError::InvalidCommand)?;
            debug!(device = device.name(), ?action, "Dispatching");
            let outcome = device.execute(action, arbiter)?;
            Ok(Reply::from_outcome(text, outcome))
        }
    }
}
