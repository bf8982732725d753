//! WatchBuilder -- fluent builder for constructing a [`Watcher`].
//!
//! # Example
//!
//! ```no_run
//! use t1ctl_watch::WatchBuilder;
//! use std::time::Duration;
//!
//! # fn example(
//! #     source: Box<dyn t1ctl_core::FrequencySource>,
//! #     signaler: Box<dyn t1ctl_core::BandSignaler>,
//! # ) -> t1ctl_core::Result<()> {
//! let watcher = WatchBuilder::new()
//!     .source(source)
//!     .signaler(signaler)
//!     .poll_interval(Duration::from_secs(2))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::sync::broadcast;

use t1ctl_core::band::BandCode;
use t1ctl_core::error::{Error, Result};
use t1ctl_core::recovery::RecoveryAction;
use t1ctl_core::signaler::BandSignaler;
use t1ctl_core::source::FrequencySource;

use crate::recovery::{DEFAULT_MAX_CONSECUTIVE_FAILURES, RecoveryPolicy};
use crate::supervisor::{SupervisorState, Watcher};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Fluent builder for [`Watcher`].
///
/// A source and a signaler are required; everything else has defaults.
pub struct WatchBuilder {
    source: Option<Box<dyn FrequencySource>>,
    signaler: Option<Box<dyn BandSignaler>>,
    recovery: Option<Box<dyn RecoveryAction>>,
    poll_interval: Duration,
    max_consecutive_failures: u32,
    initial_band: Option<BandCode>,
    event_capacity: usize,
}

impl WatchBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        WatchBuilder {
            source: None,
            signaler: None,
            recovery: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            initial_band: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Set the frequency source.
    pub fn source(mut self, source: Box<dyn FrequencySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the band signaler. The watcher takes ownership of its lines.
    pub fn signaler(mut self, signaler: Box<dyn BandSignaler>) -> Self {
        self.signaler = Some(signaler);
        self
    }

    /// Set the action run when the source stays unavailable.
    pub fn recovery(mut self, action: Box<dyn RecoveryAction>) -> Self {
        self.recovery = Some(action);
        self
    }

    /// Set the time between polls (default: 5 s).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set how many unavailable readings in a row trigger recovery
    /// (default: 10).
    pub fn max_consecutive_failures(mut self, n: u32) -> Self {
        self.max_consecutive_failures = n;
        self
    }

    /// Assume the tuner is already on `band`, so reading that band first
    /// does not trigger a transmission.
    pub fn initial_band(mut self, band: BandCode) -> Self {
        self.initial_band = Some(band);
        self
    }

    /// Set the event channel capacity (default: 64).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Build the [`Watcher`].
    pub fn build(self) -> Result<Watcher> {
        let source = self
            .source
            .ok_or_else(|| Error::InvalidConfig("a frequency source is required".into()))?;
        let signaler = self
            .signaler
            .ok_or_else(|| Error::InvalidConfig("a band signaler is required".into()))?;

        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll interval must be positive".into()));
        }
        if self.max_consecutive_failures == 0 {
            return Err(Error::InvalidConfig(
                "max_consecutive_failures must be positive".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig("event capacity must be positive".into()));
        }

        let mut policy = RecoveryPolicy::new(self.max_consecutive_failures);
        if let Some(action) = self.recovery {
            policy = policy.with_action(action);
        }

        let (event_tx, _) = broadcast::channel(self.event_capacity);
        let state = SupervisorState {
            previous_band: self.initial_band,
        };

        Ok(Watcher::new(
            source,
            signaler,
            policy,
            state,
            self.poll_interval,
            event_tx,
        ))
    }
}

impl Default for WatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use t1ctl_test_harness::{CountingRecovery, RecordingSignaler, ScriptedSource};

    fn is_invalid<T>(result: Result<T>) -> bool {
        matches!(result, Err(Error::InvalidConfig(_)))
    }

    #[test]
    fn builder_defaults() {
        let (signaler, _log) = RecordingSignaler::new();
        let watcher = WatchBuilder::new()
            .source(Box::new(ScriptedSource::from_hz(&[])))
            .signaler(Box::new(signaler))
            .build()
            .unwrap();

        assert_eq!(watcher.poll_interval(), Duration::from_secs(5));
        assert_eq!(watcher.policy().threshold(), 10);
        assert!(!watcher.policy().has_action());
        assert_eq!(watcher.state().previous_band, None);
    }

    #[test]
    fn builder_custom() {
        let (signaler, _log) = RecordingSignaler::new();
        let watcher = WatchBuilder::new()
            .source(Box::new(ScriptedSource::from_hz(&[])))
            .signaler(Box::new(signaler))
            .recovery(Box::new(CountingRecovery::new()))
            .poll_interval(Duration::from_millis(250))
            .max_consecutive_failures(4)
            .initial_band(BandCode::new(6).unwrap())
            .event_capacity(8)
            .build()
            .unwrap();

        assert_eq!(watcher.poll_interval(), Duration::from_millis(250));
        assert_eq!(watcher.policy().threshold(), 4);
        assert!(watcher.policy().has_action());
        assert_eq!(watcher.state().previous_band, BandCode::new(6));
    }

    #[test]
    fn missing_parts_rejected() {
        let (signaler, log) = RecordingSignaler::new();
        assert!(is_invalid(
            WatchBuilder::new().signaler(Box::new(signaler)).build()
        ));
        // The signaler was dropped with the builder and released its lines.
        assert_eq!(log.releases(), 1);

        assert!(is_invalid(
            WatchBuilder::new()
                .source(Box::new(ScriptedSource::from_hz(&[])))
                .build()
        ));
    }

    #[test]
    fn zero_values_rejected() {
        let build = |b: WatchBuilder| {
            let (signaler, _log) = RecordingSignaler::new();
            b.source(Box::new(ScriptedSource::from_hz(&[])))
                .signaler(Box::new(signaler))
                .build()
        };
        assert!(is_invalid(build(WatchBuilder::new().poll_interval(Duration::ZERO))));
        assert!(is_invalid(build(WatchBuilder::new().max_consecutive_failures(0))));
        assert!(is_invalid(build(WatchBuilder::new().event_capacity(0))));
    }
}
