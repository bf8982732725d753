//! Hamlib rigctl/rigctld reply decoding.
//!
//! Both the `rigctl` CLI and the `rigctld` daemon answer the `f` (get
//! frequency) command with a decimal frequency in hertz on its own line.
//! `rigctld` reports failures as a line starting with `RPRT` followed by a
//! negative Hamlib status code, e.g. `RPRT -1`. That line must never be
//! read as a number.

use t1ctl_core::error::{Error, Result};

/// The get-frequency command as sent to rigctld.
pub const FREQ_QUERY: &[u8] = b"f\n";

/// The get-frequency command as passed to the rigctl CLI.
pub const FREQ_COMMAND: &str = "f";

/// Prefix of a rigctld error report.
pub const ERROR_PREFIX: &str = "RPRT";

/// Result of decoding one reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A frequency in hertz.
    Frequency(u64),
    /// An `RPRT <code>` error report. `None` if the code was not numeric.
    Error(Option<i32>),
    /// Anything else.
    Malformed(String),
}

/// Decode one reply line. Surrounding whitespace is ignored.
pub fn decode_reply(line: &str) -> Reply {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(ERROR_PREFIX) {
        return Reply::Error(rest.trim().parse().ok());
    }

    match line.parse::<u64>() {
        Ok(freq) => Reply::Frequency(freq),
        Err(_) => Reply::Malformed(line.to_string()),
    }
}

/// Decode a get-frequency reply into hertz.
///
/// # Examples
///
/// ```
/// use t1ctl_rigctl::protocol::decode_frequency;
///
/// assert_eq!(decode_frequency("14074000\n").unwrap(), 14_074_000);
/// assert!(decode_frequency("RPRT -1\n").is_err());
/// assert!(decode_frequency("").is_err());
/// ```
pub fn decode_frequency(line: &str) -> Result<u64> {
    match decode_reply(line) {
        Reply::Frequency(freq) => Ok(freq),
        Reply::Error(Some(code)) => Err(Error::QueryFailed(format!(
            "rigctld reported {ERROR_PREFIX} {code}"
        ))),
        Reply::Error(None) => Err(Error::QueryFailed(format!(
            "rigctld reported {ERROR_PREFIX}"
        ))),
        Reply::Malformed(text) if text.is_empty() => {
            Err(Error::QueryFailed("empty frequency reply".into()))
        }
        Reply::Malformed(text) => Err(Error::QueryFailed(format!(
            "unparseable frequency reply: {text:?}"
        ))),
    }
}
