//! Blocking time source for bit-banged protocols.
//!
//! The T1 protocol is timed with blocking sleeps on a monotonic clock. On a
//! non-real-time host every hold may overrun by a millisecond or two; the
//! tuner tolerates that, since its shortest pulse is 1.5 ms and a `1` bit is
//! 4 ms.
//!
//! The [`Pacer`] trait lets tests substitute a virtual clock so protocol
//! timing can be checked exactly and without waiting.

use std::time::{Duration, Instant};

/// Blocking sleep plus a monotonic clock.
pub trait Pacer: Send {
    /// Block the calling thread for `duration`.
    fn sleep(&mut self, duration: Duration);

    /// Time elapsed since this pacer was created.
    fn elapsed(&self) -> Duration;
}

/// [`Pacer`] backed by `std::thread::sleep` and [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemPacer {
    origin: Instant,
}

impl SystemPacer {
    /// Create a pacer whose clock starts now.
    pub fn new() -> Self {
        SystemPacer {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemPacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pacer for SystemPacer {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_pacer_sleeps_at_least_requested() {
        let mut pacer = SystemPacer::new();
        let before = pacer.elapsed();
        pacer.sleep(Duration::from_millis(2));
        assert!(pacer.elapsed() - before >= Duration::from_millis(2));
    }
}
