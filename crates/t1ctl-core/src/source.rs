//! The `FrequencySource` trait -- where the operating frequency comes from.
//!
//! The supervisor polls a `dyn FrequencySource` once per cycle. Concrete
//! sources live in `t1ctl-rigctl` (Hamlib `rigctl` and `rigctld`); the test
//! harness provides scripted ones.

use std::fmt;

use async_trait::async_trait;

/// One frequency poll result.
///
/// A failed query is an explicit [`Unavailable`](FrequencyReading::Unavailable),
/// never a sentinel frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyReading {
    /// The rig reported this frequency in hertz.
    Hz(u64),
    /// The source could not produce a reading this time.
    Unavailable,
}

impl FrequencyReading {
    /// The frequency, if one was read.
    pub fn hz(self) -> Option<u64> {
        match self {
            FrequencyReading::Hz(f) => Some(f),
            FrequencyReading::Unavailable => None,
        }
    }
}

impl From<Option<u64>> for FrequencyReading {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(f) => FrequencyReading::Hz(f),
            None => FrequencyReading::Unavailable,
        }
    }
}

impl fmt::Display for FrequencyReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyReading::Hz(hz) => write!(f, "{hz} Hz"),
            FrequencyReading::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Asynchronous source of the rig's current operating frequency.
///
/// Implementations must bound every query by their own timeouts and must not
/// surface errors: all failures collapse to
/// [`FrequencyReading::Unavailable`] after being logged.
#[async_trait]
pub trait FrequencySource: Send {
    /// Query the current frequency.
    async fn query_frequency(&mut self) -> FrequencyReading;

    /// Short description for log output, e.g. `rigctld@127.0.0.1:4532`.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_hz_accessor() {
        assert_eq!(FrequencyReading::Hz(14_074_000).hz(), Some(14_074_000));
        assert_eq!(FrequencyReading::Unavailable.hz(), None);
    }

    #[test]
    fn reading_from_option() {
        assert_eq!(
            FrequencyReading::from(Some(7_074_000)),
            FrequencyReading::Hz(7_074_000)
        );
        assert_eq!(FrequencyReading::from(None), FrequencyReading::Unavailable);
    }

    #[test]
    fn reading_display() {
        assert_eq!(FrequencyReading::Hz(14_074_000).to_string(), "14074000 Hz");
        assert_eq!(FrequencyReading::Unavailable.to_string(), "unavailable");
    }
}
