//! Station-wide transmit arbitration.
//!
//! Only a bounded number of transmit-enable lines may be asserted at once.
//! The arbiter lives inside the station and is only reachable through a
//! mutable borrow of it, so every read-modify-write happens under the
//! station lock.

use crate::config::MAX_ACTIVE_TX;
use crate::error::{InterlockError, Result};
use static_assertions::const_assert;
use tracing::warn;

const_assert!(MAX_ACTIVE_TX >= 1);

#[derive(Debug, Clone)]
pub struct TransmitArbiter {
    active: usize,
    max_active: usize,
}

impl TransmitArbiter {
    pub fn new() -> Self {
        Self::with_limit(MAX_ACTIVE_TX)
    }

    pub fn with_limit(max_active: usize) -> Self {
        Self {
            active: 0,
            max_active: max_active.max(1),
        }
    }

    pub fn count(&self) -> usize {
        self.active
    }

    pub fn limit(&self) -> usize {
        self.max_active
    }

    pub fn is_transmitting(&self) -> bool {
        self.active > 0
    }

    /// Fails if another transmitter would exceed the limit. Does not reserve.
    pub fn ensure_capacity(&self) -> Result<()> {
        if self.active >= self.max_active {
            return Err(InterlockError::MaxActiveTransmit {
                max: self.max_active,
            });
        }
        Ok(())
    }

    pub fn increment(&mut self) -> Result<()> {
        self.ensure_capacity()?;
        self.active += 1;
        Ok(())
    }

    /// Release one transmitter. Never goes below zero.
    pub fn decrement(&mut self) {
        if self.active == 0 {
            warn!("Transmit arbiter decremented while idle");
            return;
        }
        self.active -= 1;
    }

    /// Seed the count from lines found keyed at startup.
    ///
    /// The count tracks the physical lines even above the limit, so no new
    /// transmitter is admitted until enough of them have been released.
    pub fn reconcile(&mut self, keyed: usize) {
        if keyed > self.max_active {
            warn!(
                keyed,
                max = self.max_active,
                "More transmitters keyed than allowed; refusing new transmit until released"
            );
        }
        self.active = keyed;
    }
}

impl Default for TransmitArbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_stops_at_limit() {
        let mut arbiter = TransmitArbiter::new();
        arbiter.increment().expect("first transmitter");
        assert!(matches!(
            arbiter.increment(),
            Err(InterlockError::MaxActiveTransmit { max: 1 })
        ));
        assert_eq!(arbiter.count(), 1);
    }

    #[test]
    fn decrement_floors_at_zero() {
        let mut arbiter = TransmitArbiter::with_limit(2);
        arbiter.increment().expect("slot");
        arbiter.decrement();
        arbiter.decrement();
        assert_eq!(arbiter.count(), 0);
        assert!(!arbiter.is_transmitting());
    }

    #[test]
    fn reconcile_above_limit_holds_until_released() {
        let mut arbiter = TransmitArbiter::new();
        arbiter.reconcile(3);
        assert_eq!(arbiter.count(), 3);
        assert!(arbiter.ensure_capacity().is_err());

        arbiter.decrement();
        arbiter.decrement();
        assert!(arbiter.ensure_capacity().is_err());
        assert!(arbiter.is_transmitting());

        arbiter.decrement();
        assert!(arbiter.ensure_capacity().is_ok());
    }

    #[test]
    fn zero_limit_is_raised_to_one() {
        assert_eq!(TransmitArbiter::with_limit(0).limit(), 1);
    }
}
