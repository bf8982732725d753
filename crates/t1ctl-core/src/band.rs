//! Amateur radio band identification for the T1 tuner.
//!
//! The T1 selects its matching network from a 4-bit band code. This module
//! holds the fixed band table and the pure [`classify`] lookup that turns a
//! raw frequency (in hertz) into that code.
//!
//! # Example
//!
//! ```
//! use t1ctl_core::{BandCode, classify};
//!
//! let code = classify(14_074_000);
//! assert_eq!(code.value(), 6);
//! assert_eq!(code.name(), "20m");
//! assert_eq!(code.to_string(), "6 (20m)");
//! assert_eq!(code.bits(), [false, true, true, false]);
//! assert_eq!(classify(13_500_000), BandCode::UNKNOWN);
//! ```

use std::fmt;

/// An inclusive frequency range in hertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BandRange {
    /// Lower bound of the range in hertz (inclusive).
    pub low_hz: u64,
    /// Upper bound of the range in hertz (inclusive).
    pub high_hz: u64,
}

impl BandRange {
    /// Create a new band range.
    pub const fn new(low_hz: u64, high_hz: u64) -> Self {
        BandRange { low_hz, high_hz }
    }

    /// Check whether a frequency (in hertz) falls within this range (inclusive).
    pub fn contains(&self, freq_hz: u64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}

impl fmt::Display for BandRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} Hz", self.low_hz, self.high_hz)
    }
}

/// A T1 band code: `1..=11` for 160m through 6m, `0` for unknown.
///
/// On the wire this is a fixed-width 4-bit value sent most significant bit
/// first; see [`BandCode::bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BandCode(u8);

impl BandCode {
    /// Out-of-band or unrecognised frequency.
    pub const UNKNOWN: BandCode = BandCode(0);

    /// Highest code the T1 understands (6m).
    pub const MAX: u8 = 11;

    /// Number of bits in the wire encoding.
    pub const WIDTH: usize = 4;

    /// Returns the code for `value`, or `None` if it is above [`BandCode::MAX`].
    pub const fn new(value: u8) -> Option<BandCode> {
        if value <= Self::MAX {
            Some(BandCode(value))
        } else {
            None
        }
    }

    /// The raw numeric code.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns `true` for code `0`.
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }

    /// The 4-bit wire encoding, most significant bit first.
    pub fn bits(self) -> [bool; Self::WIDTH] {
        let mut bits = [false; Self::WIDTH];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = (self.0 >> (Self::WIDTH - 1 - i)) & 1 == 1;
        }
        bits
    }

    /// The wire encoding as a string of `0`/`1`, e.g. `"0110"` for 20m.
    pub fn bit_string(self) -> String {
        format!("{:04b}", self.0)
    }

    /// Short band name ("20m"), or `"unknown"` for code `0`.
    pub fn name(self) -> &'static str {
        BAND_TABLE
            .iter()
            .find(|entry| entry.code == self)
            .map(|entry| entry.name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for BandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// One row of the band table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandEntry {
    /// Inclusive frequency range covered by this band.
    pub range: BandRange,
    /// Code sent to the T1 for this band.
    pub code: BandCode,
    /// Short band name.
    pub name: &'static str,
}

const fn entry(low_hz: u64, high_hz: u64, code: u8, name: &'static str) -> BandEntry {
    BandEntry {
        range: BandRange::new(low_hz, high_hz),
        code: BandCode(code),
        name,
    }
}

/// The T1 band table in scan order, lowest band first.
pub const BAND_TABLE: &[BandEntry] = &[
    entry(1_800_000, 2_000_000, 1, "160m"),
    entry(3_500_000, 4_000_000, 2, "80m"),
    entry(5_330_500, 5_405_000, 3, "60m"),
    entry(7_000_000, 7_300_000, 4, "40m"),
    entry(10_100_000, 10_150_000, 5, "30m"),
    entry(14_000_000, 14_350_000, 6, "20m"),
    entry(18_068_000, 18_168_000, 7, "17m"),
    entry(21_000_000, 21_450_000, 8, "15m"),
    entry(24_890_000, 24_990_000, 9, "12m"),
    entry(28_000_000, 29_700_000, 10, "10m"),
    entry(50_000_000, 54_000_000, 11, "6m"),
];

/// Returns the T1 band code for a frequency in hertz.
///
/// Scans [`BAND_TABLE`] in order and returns the first match, or
/// [`BandCode::UNKNOWN`] if the frequency is outside every band.
pub fn classify(freq_hz: u64) -> BandCode {
    BAND_TABLE
        .iter()
        .find(|entry| entry.range.contains(freq_hz))
        .map(|entry| entry.code)
        .unwrap_or(BandCode::UNKNOWN)
}
