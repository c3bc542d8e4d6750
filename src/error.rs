//! Error types for the station daemon.
//!
//! [`InterlockError`] is the set of conditions a device state machine can
//! report back to the command router. The remaining enums cover the
//! collaborators around the interlock engine: line I/O, pin ownership,
//! configuration and the network server.

use std::io;
use std::path::PathBuf;

/// A condition raised by a device state machine.
///
/// None of these are crashes. The router maps every variant to exactly one
/// wire reply.
#[derive(Debug, thiserror::Error)]
pub enum InterlockError {
    /// Transmit requested while the power amplifier is unpowered.
    #[error("transmit disabled: power amplifier is off")]
    TransmitDisabled,

    /// The action is unsafe given the current transmit state.
    #[error("transmit conflict")]
    TransmitConflict,

    /// The transmit arbiter is already at its ceiling.
    #[error("maximum active transmitters reached ({max})")]
    MaxActiveTransmit { max: usize },

    /// Power-down requested before the post-transmit cooldown expired.
    #[error("cooldown not elapsed: {seconds}s remaining")]
    CooldownNotElapsed { seconds: u64 },

    /// The device variant has no such component.
    #[error("invalid component")]
    InvalidComponent,

    /// The token sequence does not name a supported operation.
    #[error("invalid command")]
    InvalidCommand,

    /// A line read or write failed.
    #[error("hardware fault: {0}")]
    Hardware(#[from] GpioError),
}

/// Failure reading or driving a GPIO line.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    #[error("I/O error on {label} ({path}): {source}")]
    Io {
        label: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unexpected value {value:?} read from {label}")]
    InvalidValue { label: String, value: String },

    #[error("line {label} is faulted")]
    Faulted { label: String },
}

/// Failure handing out a physical pin to a logical owner.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("pin label '{label}' is not configured")]
    UnknownLabel { label: String },

    #[error("pin {pin} ('{label}') is already allocated to device '{owner}'")]
    Conflict {
        pin: u32,
        label: String,
        owner: String,
    },

    #[error("failed to open pin '{label}': {source}")]
    Line {
        label: String,
        #[source]
        source: GpioError,
    },
}

/// Failure loading or validating the daemon configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure bringing up or running the station daemon.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error("startup line read failed: {0}")]
    Gpio(#[from] GpioError),

    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, InterlockError>;
