//! Wire protocol: whitespace-delimited command tokens in, one text reply out.
//!
//! ```text
//! vhf rf-ptt on          -> SUCCESS: vhf rf-ptt on
//! l-band pa-power status -> l-band pa-power OFF
//! rotator status         -> rotator power ON
//! gettemp                -> temp: 41.5
//! ```

use crate::devices::Outcome;
use crate::error::InterlockError;
use heapless::Vec;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_DATAGRAM_SIZE: usize = 1024;
pub const MAX_TOKENS: usize = 3;

pub type Tokens<'a> = Vec<&'a str, MAX_TOKENS>;

/// Split a datagram into at most [`MAX_TOKENS`] tokens.
pub fn tokenize(datagram: &str) -> Result<Tokens<'_>, InterlockError> {
    let mut tokens = Tokens::new();
    for token in datagram.split_whitespace() {
        tokens
            .push(token)
            .map_err(|_| InterlockError::InvalidCommand)?;
    }
    if tokens.is_empty() {
        return Err(InterlockError::InvalidCommand);
    }
    Ok(tokens)
}

fn normalize(token: &str) -> String {
    token.replace('_', "-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceId {
    Vhf,
    Uhf,
    LBand,
    VuTxRelay,
    SatnogsHost,
    RadioHost,
    Rotator,
    SdrB200,
}

impl DeviceId {
    pub const ALL: [DeviceId; 8] = [
        DeviceId::Vhf,
        DeviceId::Uhf,
        DeviceId::LBand,
        DeviceId::VuTxRelay,
        DeviceId::SatnogsHost,
        DeviceId::RadioHost,
        DeviceId::Rotator,
        DeviceId::SdrB200,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceId::Vhf => "vhf",
            DeviceId::Uhf => "uhf",
            DeviceId::LBand => "l-band",
            DeviceId::VuTxRelay => "vu-tx-relay",
            DeviceId::SatnogsHost => "satnogs-host",
            DeviceId::RadioHost => "radio-host",
            DeviceId::Rotator => "rotator",
            DeviceId::SdrB200 => "sdr-b200",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = normalize(token);
        Self::ALL.into_iter().find(|id| id.as_str() == token)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every controllable line name used on the wire, across all device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    RfPtt,
    PaPower,
    TrRelay,
    Lna,
    Polarization,
    Power,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Component::RfPtt => "rf-ptt",
            Component::PaPower => "pa-power",
            Component::TrRelay => "tr-relay",
            Component::Lna => "lna",
            Component::Polarization => "polarization",
            Component::Power => "power",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match normalize(token).as_str() {
            "rf-ptt" => Some(Component::RfPtt),
            "pa-power" => Some(Component::PaPower),
            "tr-relay" => Some(Component::TrRelay),
            "lna" => Some(Component::Lna),
            "polarization" => Some(Component::Polarization),
            "power" => Some(Component::Power),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    On,
    Off,
    Left,
    Right,
}

impl Verb {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "on" => Some(Verb::On),
            "off" => Some(Verb::Off),
            "left" => Some(Verb::Left),
            "right" => Some(Verb::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    DeviceStatus,
    ComponentStatus(Component),
    Action(Component, Verb),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Temperature,
    Device { device: DeviceId, request: Request },
}

/// A parsed request, plus the text it arrived as for echoing in replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub text: String,
    pub target: Target,
}

impl Command {
    pub fn parse(tokens: &[&str]) -> Result<Self, InterlockError> {
        let target = match *tokens {
            ["gettemp"] => Target::Temperature,
            [device, "status"] => Target::Device {
                device: parse_device(device)?,
                request: Request::DeviceStatus,
            },
            [device, component, "status"] => Target::Device {
                device: parse_device(device)?,
                request: Request::ComponentStatus(parse_component(component)?),
            },
            [device, component, verb] => Target::Device {
                device: parse_device(device)?,
                request: Request::Action(
                    parse_component(component)?,
                    Verb::from_token(verb).ok_or(InterlockError::InvalidCommand)?,
                ),
            },
            _ => return Err(InterlockError::InvalidCommand),
        };

        Ok(Self {
            text: tokens.join(" "),
            target,
        })
    }

    pub fn parse_datagram(datagram: &str) -> Result<Self, InterlockError> {
        Self::parse(&tokenize(datagram)?)
    }
}

fn parse_device(token: &str) -> Result<DeviceId, InterlockError> {
    DeviceId::from_token(token).ok_or(InterlockError::InvalidCommand)
}

fn parse_component(token: &str) -> Result<Component, InterlockError> {
    Component::from_token(token).ok_or(InterlockError::InvalidCommand)
}

/// The single reply sent back for each datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Success(String),
    NoChange(String),
    Conflict(String),
    MaxActive(String),
    HardwareFault(String),
    Cooldown { seconds: u64 },
    Confirm { seconds: u64 },
    Status(String),
    Temperature(f64),
    Invalid,
    InternalError,
}

impl Reply {
    pub fn from_outcome(command: &str, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied => Reply::Success(command.to_string()),
            Outcome::NoChange => Reply::NoChange(command.to_string()),
            Outcome::AwaitingConfirmation { seconds } => Reply::Confirm { seconds },
        }
    }

    pub fn from_error(command: &str, error: &InterlockError) -> Self {
        match error {
            InterlockError::TransmitDisabled | InterlockError::TransmitConflict => {
                Reply::Conflict(command.to_string())
            }
            InterlockError::MaxActiveTransmit { .. } => Reply::MaxActive(command.to_string()),
            InterlockError::CooldownNotElapsed { seconds } => Reply::Cooldown { seconds: *seconds },
            InterlockError::InvalidComponent | InterlockError::InvalidCommand => Reply::Invalid,
            InterlockError::Hardware(_) => Reply::HardwareFault(command.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Reply::Conflict(_)
                | Reply::MaxActive(_)
                | Reply::HardwareFault(_)
                | Reply::Invalid
                | Reply::InternalError
        )
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Success(cmd) => writeln!(f, "SUCCESS: {cmd}"),
            Reply::NoChange(cmd) => writeln!(f, "WARNING: {cmd} No Change"),
            Reply::Conflict(cmd) => writeln!(f, "FAIL: {cmd} PTT Conflict"),
            Reply::MaxActive(cmd) => writeln!(f, "FAIL: {cmd} Max PTT"),
            Reply::HardwareFault(cmd) => writeln!(f, "FAIL: {cmd} Hardware Fault"),
            Reply::Cooldown { seconds } => {
                writeln!(f, "WARNING: Please wait {seconds} seconds and try again")
            }
            Reply::Confirm { seconds } => writeln!(
                f,
                "Re-enter the command within the next {seconds} seconds if you would like to proceed"
            ),
            // Status text already carries one newline-terminated line per component.
            Reply::Status(lines) => f.write_str(lines),
            // Whole degrees keep one decimal place: `temp: 41.0`.
            Reply::Temperature(celsius) if celsius.fract() == 0.0 => {
                writeln!(f, "temp: {celsius:.1}")
            }
            Reply::Temperature(celsius) => writeln!(f, "temp: {celsius}"),
            Reply::Invalid => writeln!(f, "FAIL: Invalid Command"),
            Reply::InternalError => writeln!(f, "FAIL: Internal Error"),
        }
    }
}

/// How an operator client should present a reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Success,
    Warning,
    Failure,
    Confirm,
    Status,
    Temperature,
}

impl ReplyKind {
    pub fn classify(line: &str) -> Self {
        if line.starts_with("SUCCESS:") {
            ReplyKind::Success
        } else if line.starts_with("WARNING:") {
            ReplyKind::Warning
        } else if line.starts_with("FAIL") {
            ReplyKind::Failure
        } else if line.starts_with("Re-enter") {
            ReplyKind::Confirm
        } else if line.starts_with("temp:") {
            ReplyKind::Temperature
        } else {
            ReplyKind::Status
        }
    }
}

/// One `{device} {component} {state}` line of a status reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    pub device: String,
    pub component: String,
    pub state: String,
}

impl StatusLine {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let status = Self {
            device: parts.next()?.to_string(),
            component: parts.next()?.to_string(),
            state: parts.next()?.to_string(),
        };
        if parts.next().is_some()
            || !matches!(status.state.as_str(), "ON" | "OFF" | "LEFT" | "RIGHT")
        {
            return None;
        }
        Some(status)
    }
}
