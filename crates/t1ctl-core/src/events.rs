//! Watch supervisor event types.
//!
//! Events are emitted by the supervisor through a `tokio::sync::broadcast`
//! channel as it polls, signals, and recovers. Status displays and tests
//! subscribe to these instead of scraping logs.

use crate::band::BandCode;

/// An event emitted by the watch supervisor.
///
/// Delivered best-effort through a bounded broadcast channel; a slow
/// subscriber may miss events.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A frequency was read from the source and classified.
    FrequencyRead {
        /// Frequency in hertz.
        freq_hz: u64,
        /// Band code the frequency classified to.
        band: BandCode,
    },

    /// The tuner was told about a new band.
    BandSignaled {
        /// The band code that was transmitted.
        band: BandCode,
        /// The frequency that triggered the change.
        freq_hz: u64,
    },

    /// A signal attempt failed; the band will be retried on the next poll.
    SignalFailed {
        /// The band code that could not be delivered.
        band: BandCode,
        /// Error description.
        reason: String,
    },

    /// The frequency source returned no reading.
    SourceUnavailable {
        /// Unavailable readings in a row, including this one.
        consecutive: u32,
    },

    /// The consecutive-failure threshold was reached and recovery ran.
    LinkRecovery {
        /// Failure count that triggered the recovery.
        failures: u32,
        /// Whether the recovery action itself succeeded.
        succeeded: bool,
    },

    /// The supervisor stopped and released its lines.
    Stopped,
}
