//! Error types for t1ctl.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Hardware, frequency-source, tuner
//! protocol, and configuration errors are all captured here.

use std::fmt;
use std::time::Duration;

/// Which half of the T1 acknowledgment pulse was being waited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Waiting for the acknowledgment line to go high.
    AwaitHigh,
    /// Waiting for the acknowledgment line to return low.
    AwaitLow,
}

impl fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakePhase::AwaitHigh => write!(f, "await-high"),
            HandshakePhase::AwaitLow => write!(f, "await-low"),
        }
    }
}

/// The error type for all t1ctl operations.
///
/// Only [`HardwareUnavailable`](Error::HardwareUnavailable) and
/// [`InvalidConfig`](Error::InvalidConfig) are meant to end the process.
/// Everything else is absorbed by the supervisor and retried on a later
/// polling cycle; see [`Error::is_transient`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A digital line could not be claimed (busy, missing, permission denied).
    #[error("hardware unavailable: {line}: {reason}")]
    HardwareUnavailable {
        /// Human-readable line identifier, e.g. `gpiochip0:17`.
        line: String,
        /// Underlying driver error.
        reason: String,
    },

    /// Reading or writing an already-acquired line failed.
    #[error("line I/O error: {0}")]
    Line(String),

    /// The frequency source could not produce a reading.
    #[error("frequency query failed: {0}")]
    QueryFailed(String),

    /// The tuner never completed its acknowledgment pulse.
    #[error("T1 handshake timed out ({phase}) after {} ms", .waited.as_millis())]
    HandshakeTimeout {
        /// The phase that was still pending when the budget ran out.
        phase: HandshakePhase,
        /// Time spent waiting before giving up.
        waited: Duration,
    },

    /// The frequency source has been unavailable too many times in a row.
    #[error("control link exhausted after {failures} consecutive failures")]
    LinkExhausted {
        /// Number of consecutive unavailable readings.
        failures: u32,
    },

    /// The recovery action (e.g. restarting `rigctld`) failed.
    #[error("recovery failed: {0}")]
    RecoveryFailed(String),

    /// Startup configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the supervisor should log this error and keep going.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            Error::HardwareUnavailable { .. } | Error::InvalidConfig(_)
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_hardware_unavailable() {
        let e = Error::HardwareUnavailable {
            line: "gpiochip0:17".into(),
            reason: "Device or resource busy".into(),
        };
        assert_eq!(
            e.to_string(),
            "hardware unavailable: gpiochip0:17: Device or resource busy"
        );
    }

    #[test]
    fn error_display_query_failed() {
        let e = Error::QueryFailed("RPRT -1".into());
        assert_eq!(e.to_string(), "frequency query failed: RPRT -1");
    }

    #[test]
    fn error_display_handshake_timeout() {
        let e = Error::HandshakeTimeout {
            phase: HandshakePhase::AwaitLow,
            waited: Duration::from_millis(2000),
        };
        assert_eq!(
            e.to_string(),
            "T1 handshake timed out (await-low) after 2000 ms"
        );
    }

    #[test]
    fn error_display_link_exhausted() {
        let e = Error::LinkExhausted { failures: 10 };
        assert_eq!(
            e.to_string(),
            "control link exhausted after 10 consecutive failures"
        );
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "rigctl not found");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("rigctl not found"));
    }

    #[test]
    fn transient_classification() {
        assert!(Error::QueryFailed("x".into()).is_transient());
        assert!(Error::LinkExhausted { failures: 10 }.is_transient());
        assert!(Error::Line("x".into()).is_transient());
        assert!(
            Error::HandshakeTimeout {
                phase: HandshakePhase::AwaitHigh,
                waited: Duration::from_millis(1),
            }
            .is_transient()
        );

        assert!(!Error::InvalidConfig("x".into()).is_transient());
        assert!(
            !Error::HardwareUnavailable {
                line: "l".into(),
                reason: "r".into(),
            }
            .is_transient()
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
