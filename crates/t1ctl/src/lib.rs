//! # t1ctl -- Band Following for the T1 Automatic Antenna Tuner
//!
//! `t1ctl` keeps a T1 automatic antenna tuner on the band your rig is
//! tuned to. It polls the rig's frequency through Hamlib (`rigctl` or
//! `rigctld`), maps it to the T1's 4-bit band code, and bit-bangs that code
//! to the tuner over two GPIO lines whenever the band changes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use t1ctl::gpio::GpioController;
//! use t1ctl::rigctl::RigctldClient;
//! use t1ctl::tuner::{SignalingVariant, T1Signaler};
//! use t1ctl::watch::WatchBuilder;
//! use t1ctl::{LineSpec, SystemPacer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let lines = GpioController::new().acquire_tuner_lines(
//!         &LineSpec::output("gpiochip0", 17),
//!         &LineSpec::input("gpiochip0", 18),
//!     )?;
//!     let signaler = T1Signaler::from_lines(lines, SignalingVariant::handshake(), SystemPacer::new())?;
//!
//!     let watcher = WatchBuilder::new()
//!         .source(Box::new(RigctldClient::new("127.0.0.1:4532")))
//!         .signaler(Box::new(signaler))
//!         .poll_interval(Duration::from_secs(5))
//!         .build()?;
//!
//!     let summary = watcher.run(CancellationToken::new()).await?;
//!     println!("{summary:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate               | Purpose                                        |
//! |----------------------|------------------------------------------------|
//! | `t1ctl-core`         | Band table, traits ([`FrequencySource`], [`BandSignaler`], lines), errors |
//! | `t1ctl-gpio`         | GPIO character-device lines                    |
//! | `t1ctl-rigctl`       | Hamlib `rigctl` / `rigctld` frequency sources, daemon restart |
//! | `t1ctl-tuner`        | T1 band-select wire protocol                   |
//! | `t1ctl-watch`        | Polling supervisor with restart escalation     |
//! | **`t1ctl`**          | This facade crate -- re-exports everything     |
//!
//! ## Feature Flags
//!
//! | Feature  | Enables                                  | Default |
//! |----------|------------------------------------------|---------|
//! | `gpio`   | [`gpio`] module (Linux GPIO lines)       | yes     |
//! | `rigctl` | [`rigctl`] module (Hamlib sources)       | yes     |
//!
//! Without either feature the crate still provides the protocol and the
//! supervisor, for use with custom lines or frequency sources.
//!
//! ## Events
//!
//! The supervisor publishes [`WatchEvent`]s through a broadcast channel:
//!
//! ```no_run
//! use t1ctl::WatchEvent;
//! # async fn example(watcher: &t1ctl::watch::Watcher) {
//! let mut events = watcher.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let WatchEvent::BandSignaled { band, freq_hz } = event {
//!         println!("tuner now on {band} ({freq_hz} Hz)");
//!     }
//! }
//! # }
//! ```

pub use t1ctl_core::*;

/// The T1 band-select wire protocol.
///
/// Provides [`T1Signaler`](tuner::T1Signaler), which implements
/// [`BandSignaler`] over a tune line and a data line using either the
/// handshake or the fixed-delay synchronization.
pub mod tuner {
    pub use t1ctl_tuner::*;
}

/// The polling supervisor.
///
/// Provides [`Watcher`](watch::Watcher) and
/// [`WatchBuilder`](watch::WatchBuilder).
pub mod watch {
    pub use t1ctl_watch::*;
}

/// Linux GPIO character-device backend.
///
/// Provides [`GpioController`](gpio::GpioController) for claiming the tune
/// and data lines from `/dev/gpiochipN`.
#[cfg(feature = "gpio")]
pub mod gpio {
    pub use t1ctl_gpio::*;
}

/// Hamlib frequency sources.
///
/// Provides [`RigctlProcess`](rigctl::RigctlProcess),
/// [`RigctldClient`](rigctl::RigctldClient), and the
/// [`DaemonRestart`](rigctl::DaemonRestart) recovery action.
#[cfg(feature = "rigctl")]
pub mod rigctl {
    pub use t1ctl_rigctl::*;
}

/// Returns the T1 band table as `(name, low_hz, high_hz, code)` rows, for
/// status displays and `--list-bands` style output.
///
/// # Example
///
/// ```
/// let rows = t1ctl::band_rows();
/// assert_eq!(rows[0], ("160m", 1_800_000, 2_000_000, 1));
/// ```
pub fn band_rows() -> Vec<(&'static str, u64, u64, u8)> {
    BAND_TABLE
        .iter()
        .map(|entry| {
            (
                entry.name,
                entry.range.low_hz,
                entry.range.high_hz,
                entry.code.value(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use t1ctl_test_harness::{MockBench, ScriptedSource};
    use tokio_util::sync::CancellationToken;

    #[test]
    fn band_rows_cover_table() {
        let rows = band_rows();
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[10], ("6m", 50_000_000, 54_000_000, 11));
    }

    /// Full pipeline: scripted frequencies through the supervisor to the
    /// fixed-delay wire protocol on mock lines.
    #[tokio::test]
    async fn frequencies_reach_the_wire() {
        let bench = MockBench::new();
        let signaler = tuner::T1Signaler::fixed_delay(
            Box::new(bench.output("tune")),
            Box::new(bench.output("data")),
            bench.pacer(),
        );

        let cancel = CancellationToken::new();
        let source = ScriptedSource::from_hz(&[7_074_000, 7_074_000, 28_074_000])
            .cancel_when_done(cancel.clone());
        let watcher = watch::WatchBuilder::new()
            .source(Box::new(source))
            .signaler(Box::new(signaler))
            .poll_interval(Duration::from_millis(1))
            .build()
            .unwrap();

        let summary = watcher.run(cancel).await.unwrap();
        assert_eq!(summary.signals_sent, 2);

        // Two activation pulses on the tune line, one per band change.
        let activations: Vec<_> = bench
            .pulses("tune")
            .into_iter()
            .filter(|p| p.width == Duration::from_millis(500))
            .collect();
        assert_eq!(activations.len(), 2);
        // 40m = 0100, 10m = 1010, each followed by the trailer pulse.
        assert_eq!(bench.pulses("data").len(), 10);
        assert_eq!(bench.releases("tune"), 1);
        assert_eq!(bench.releases("data"), 1);
    }
}
