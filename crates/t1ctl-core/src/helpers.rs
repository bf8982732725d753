//! Formatting helpers for log output and band listings.

/// Format a frequency in hertz as MHz with six decimals, e.g.
/// `"14.074000 MHz"`. Integer arithmetic, so every hertz is shown exactly.
///
/// # Example
///
/// ```
/// use t1ctl_core::format_freq_mhz;
///
/// assert_eq!(format_freq_mhz(14_074_000), "14.074000 MHz");
/// assert_eq!(format_freq_mhz(5_405_000), "5.405000 MHz");
/// ```
pub fn format_freq_mhz(freq_hz: u64) -> String {
    format!("{}.{:06} MHz", freq_hz / 1_000_000, freq_hz % 1_000_000)
}

/// Format the inclusive range of a band as `"low-high MHz"`.
pub fn format_range_mhz(low_hz: u64, high_hz: u64) -> String {
    format!(
        "{}.{:06}-{}.{:06} MHz",
        low_hz / 1_000_000,
        low_hz % 1_000_000,
        high_hz / 1_000_000,
        high_hz % 1_000_000
    )
}
