//! Post-transmit cooldown before the power amplifier may be switched off.

use crate::config::PTT_COOLDOWN_SECS;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CooldownTracker {
    /// `None` until the first transmit-disable: the cooldown counts as
    /// already elapsed at startup.
    last_tx_disabled_at: Option<Instant>,
    cooldown: Duration,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::with_cooldown(Duration::from_secs(PTT_COOLDOWN_SECS))
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            last_tx_disabled_at: None,
            cooldown,
        }
    }

    pub fn record_disabled(&mut self, now: Instant) {
        self.last_tx_disabled_at = Some(now);
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_tx_disabled_at {
            Some(at) => self
                .cooldown
                .saturating_sub(now.saturating_duration_since(at)),
            None => Duration::ZERO,
        }
    }

    pub fn seconds_until_ready(&self, now: Instant) -> f64 {
        self.remaining(now).as_secs_f64()
    }

    /// Ready once strictly more than the cooldown has passed.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_tx_disabled_at {
            Some(at) => now.saturating_duration_since(at) > self.cooldown,
            None => true,
        }
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_at_startup() {
        let cooldown = CooldownTracker::new();
        let now = Instant::now();
        assert!(cooldown.is_ready(now));
        assert_eq!(cooldown.remaining(now), Duration::ZERO);
    }

    #[test]
    fn counts_down_after_disable() {
        let mut cooldown = CooldownTracker::with_cooldown(Duration::from_secs(10));
        let start = Instant::now();
        cooldown.record_disabled(start);

        assert!(!cooldown.is_ready(start));
        assert!((cooldown.seconds_until_ready(start + Duration::from_millis(2500)) - 7.5).abs() < 1e-9);

        // Ready only once strictly past the cooldown
        let boundary = start + Duration::from_secs(10);
        assert!(!cooldown.is_ready(boundary));
        assert_eq!(cooldown.remaining(boundary), Duration::ZERO);
        assert!(cooldown.is_ready(boundary + Duration::from_millis(1)));
    }
}
