//! Time source for dwells, settle delays and the send throttle

use std::time::{Duration, Instant};

/// Monotonic time plus the ability to wait
///
/// All timing in the controller goes through this trait so simulations and
/// tests can run without real sleeps.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's epoch
    fn now(&self) -> Duration;

    /// Block the control thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by `Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
