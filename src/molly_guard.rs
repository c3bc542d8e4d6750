//! Two-phase confirmation for destructive power operations.
//!
//! The first request arms the guard and is refused. The same request
//! repeated inside the window goes through. A repeat after the window is a
//! fresh first request.

use crate::config::GUARD_WINDOW_SECS;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardStatus {
    Confirmed,
    AwaitingConfirmation { seconds: u64 },
}

#[derive(Debug, Clone)]
pub struct GuardTimer {
    pending_since: Option<Instant>,
    window: Duration,
}

impl GuardTimer {
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(GUARD_WINDOW_SECS))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            pending_since: None,
            window,
        }
    }

    pub fn check_and_arm(&mut self, now: Instant) -> GuardStatus {
        match self.pending_since {
            Some(armed) if now.saturating_duration_since(armed) <= self.window => {
                self.pending_since = None;
                GuardStatus::Confirmed
            }
            _ => {
                self.pending_since = Some(now);
                GuardStatus::AwaitingConfirmation {
                    seconds: self.window.as_secs(),
                }
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending_since.is_some()
    }
}

impl Default for GuardTimer {
    fn default() -> Self {
        Self::new()
    }
}
