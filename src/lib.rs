//! # Station Daemon
//!
//! Safety interlocks for the RF chain of a satellite ground station,
//! controlled over a line-oriented UDP command protocol.
//!
//! ## Features
//!
//! - **Transmit arbitration**: a station-wide ceiling on simultaneously keyed transmitters
//! - **Amplifier state machines**: ordered relay, LNA and polarization handling around transmit
//! - **Molly guard**: power amplifier switch-on must be repeated within a window
//! - **Cooldown**: power amplifier switch-off is held back after transmit ends
//! - **Pluggable lines**: Linux sysfs GPIO or an in-memory simulation
//!
//! ## Quick Start
//!
//! ```rust
//! use stationd::{PinAllocator, Station, StationConfig, SystemClock};
//! use std::sync::Arc;
//!
//! let config = StationConfig::simulated();
//! let mut allocator = PinAllocator::new(&config);
//! let mut station = Station::open(&config, &mut allocator, Arc::new(SystemClock))
//!     .expect("simulated station opens");
//!
//! print!("{}", station.handle("vhf status"));
//! print!("{}", station.handle("rotator power on"));
//! ```
//!
//! ## Architecture
//!
//! - [`station`] - Device registry and command router
//! - [`devices`] - Amplifier and accessory state machines
//! - [`arbiter`] - Transmit arbiter shared by all amplifiers
//! - [`molly_guard`] / [`cooldown`] - Per-amplifier timers
//! - [`protocol`] - Command parsing and reply formatting
//! - [`server`] - UDP front end
//! - [`gpio`] / [`allocator`] - Line backends and pin ownership

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod allocator;
pub mod arbiter;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod devices;
pub mod error;
pub mod gpio;
pub mod molly_guard;
pub mod protocol;
pub mod sensor;
pub mod server;
pub mod station;

// Re-export main public types for convenience
pub use allocator::PinAllocator;
pub use arbiter::TransmitArbiter;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::StationConfig;
pub use devices::Outcome;
pub use error::{DaemonError, InterlockError};
pub use protocol::{Command, Reply};
pub use server::StationServer;
pub use station::Station;
