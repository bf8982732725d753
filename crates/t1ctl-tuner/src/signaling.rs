//! T1 signaling state machine.
//!
//! Phases run strictly in order with no backward transitions:
//! activate, synchronize (handshake or fixed delay), transmit bits,
//! finalize. Finalize runs on every exit path, so the tune line is never
//! left high after a failed attempt.

use std::fmt;
use std::time::Duration;

use tracing::{debug, trace, warn};

use t1ctl_core::band::BandCode;
use t1ctl_core::error::{Error, HandshakePhase, Result};
use t1ctl_core::line::{DataLine, InputLine, OutputLine, TunerLines};
use t1ctl_core::signaler::BandSignaler;
use t1ctl_core::timing::{Pacer, SystemPacer};

/// Tune-line high time that wakes the tuner.
pub const ACTIVATION_PULSE: Duration = Duration::from_millis(500);

/// Sampling period while waiting for the acknowledgment pulse.
pub const HANDSHAKE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Quiet time between the end of the acknowledgment and the first bit.
pub const INTER_FRAME_DELAY: Duration = Duration::from_millis(10);

/// Wait used instead of the handshake when no acknowledgment is wired.
pub const FIXED_SYNC_DELAY: Duration = Duration::from_millis(60);

/// High time for a `1` bit.
pub const ONE_PULSE: Duration = Duration::from_millis(4);

/// High time for a `0` bit. Also the shortest pulse the T1 can detect.
pub const ZERO_PULSE: Duration = Duration::from_micros(1500);

/// Low time after every bit.
pub const BIT_GAP: Duration = Duration::from_micros(1500);

/// Closing pulse on the data line in fixed-delay wiring.
pub const TRAILER_PULSE: Duration = Duration::from_micros(1500);

/// Default bound on the whole acknowledgment wait.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// How the controller synchronizes with the tuner after activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingVariant {
    /// Wait for the tuner's acknowledgment pulse on the data input.
    /// Bits are sent on the tune line.
    Handshake {
        /// Budget for seeing the acknowledgment go high and back low.
        timeout: Duration,
    },
    /// Wait a fixed 60 ms. Bits are sent on the data output, followed by a
    /// trailing 1.5 ms pulse.
    FixedDelay,
}

impl SignalingVariant {
    /// Handshake variant with [`DEFAULT_HANDSHAKE_TIMEOUT`].
    pub fn handshake() -> Self {
        SignalingVariant::Handshake {
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl fmt::Display for SignalingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalingVariant::Handshake { timeout } => {
                write!(f, "handshake (timeout {} ms)", timeout.as_millis())
            }
            SignalingVariant::FixedDelay => write!(f, "fixed-delay"),
        }
    }
}

/// The line used for synchronization, bound to its variant.
enum SyncLine {
    Handshake {
        ack: Box<dyn InputLine>,
        timeout: Duration,
    },
    FixedDelay {
        data: Box<dyn OutputLine>,
    },
}

/// Drives the T1 band-select protocol over two digital lines.
///
/// The signaler owns its lines for the life of the process. Dropping it
/// drops the lines, which release themselves; [`BandSignaler::release`]
/// does the same eagerly.
pub struct T1Signaler<P: Pacer = SystemPacer> {
    tune: Box<dyn OutputLine>,
    sync: SyncLine,
    pacer: P,
}

impl<P: Pacer> T1Signaler<P> {
    /// Handshake wiring: tune output plus acknowledgment input.
    pub fn handshake(
        tune: Box<dyn OutputLine>,
        ack: Box<dyn InputLine>,
        timeout: Duration,
        pacer: P,
    ) -> Self {
        T1Signaler {
            tune,
            sync: SyncLine::Handshake { ack, timeout },
            pacer,
        }
    }

    /// Fixed-delay wiring: tune output plus data output.
    pub fn fixed_delay(tune: Box<dyn OutputLine>, data: Box<dyn OutputLine>, pacer: P) -> Self {
        T1Signaler {
            tune,
            sync: SyncLine::FixedDelay { data },
            pacer,
        }
    }

    /// Build from acquired lines, checking that the data line direction
    /// matches the variant.
    ///
    /// On a mismatch the lines are released and
    /// [`Error::InvalidConfig`] is returned.
    pub fn from_lines(lines: TunerLines, variant: SignalingVariant, pacer: P) -> Result<Self> {
        let TunerLines { mut tune, data } = lines;
        match (variant, data) {
            (SignalingVariant::Handshake { timeout }, DataLine::Input(ack)) => {
                Ok(Self::handshake(tune, ack, timeout, pacer))
            }
            (SignalingVariant::FixedDelay, DataLine::Output(data)) => {
                Ok(Self::fixed_delay(tune, data, pacer))
            }
            (variant, mut data) => {
                let msg = format!(
                    "{variant} signaling cannot use data line {} as {}",
                    data.label(),
                    data.direction()
                );
                tune.release();
                data.release();
                Err(Error::InvalidConfig(msg))
            }
        }
    }

    /// The variant this signaler was built for.
    pub fn variant(&self) -> SignalingVariant {
        match &self.sync {
            SyncLine::Handshake { timeout, .. } => SignalingVariant::Handshake { timeout: *timeout },
            SyncLine::FixedDelay { .. } => SignalingVariant::FixedDelay,
        }
    }

    /// Transmit `band` to the tuner. Blocks for roughly 0.5-0.6 s, or up to
    /// the handshake timeout longer if the tuner is slow to acknowledge.
    pub fn send_band(&mut self, band: BandCode) -> Result<()> {
        debug!(
            band = %band,
            bits = %band.bit_string(),
            variant = %self.variant(),
            "Sending band to T1"
        );

        let result = self.transmit(band);
        let finalized = self.finalize();

        match &result {
            Ok(()) => debug!(band = %band, "Finished sending band to T1"),
            Err(e) => warn!(band = %band, error = %e, "T1 signal attempt abandoned"),
        }

        result.and(finalized)
    }

    fn transmit(&mut self, band: BandCode) -> Result<()> {
        trace!("activate");
        pulse(self.tune.as_mut(), &mut self.pacer, ACTIVATION_PULSE)?;

        match &mut self.sync {
            SyncLine::Handshake { ack, timeout } => {
                await_handshake(ack.as_mut(), &mut self.pacer, *timeout)?;
                trace!("inter-frame delay");
                self.pacer.sleep(INTER_FRAME_DELAY);
                send_bits(self.tune.as_mut(), &mut self.pacer, band)?;
            }
            SyncLine::FixedDelay { data } => {
                trace!("fixed sync delay");
                self.pacer.sleep(FIXED_SYNC_DELAY);
                send_bits(data.as_mut(), &mut self.pacer, band)?;
                trace!("trailer pulse");
                pulse(data.as_mut(), &mut self.pacer, TRAILER_PULSE)?;
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        trace!("finalize");
        let tune = self.tune.set_value(false);
        let data = match &mut self.sync {
            SyncLine::FixedDelay { data } => data.set_value(false),
            SyncLine::Handshake { .. } => Ok(()),
        };
        tune.and(data)
    }
}

impl<P: Pacer + 'static> BandSignaler for T1Signaler<P> {
    fn signal(&mut self, band: BandCode) -> Result<()> {
        self.send_band(band)
    }

    fn release(&mut self) {
        self.tune.release();
        match &mut self.sync {
            SyncLine::Handshake { ack, .. } => ack.release(),
            SyncLine::FixedDelay { data } => data.release(),
        }
    }
}

/// Drive `line` high for `width`, then low.
fn pulse<P: Pacer>(line: &mut dyn OutputLine, pacer: &mut P, width: Duration) -> Result<()> {
    line.set_value(true)?;
    pacer.sleep(width);
    line.set_value(false)
}

/// Send the 4-bit code MSB first, pulse-width encoded.
fn send_bits<P: Pacer>(line: &mut dyn OutputLine, pacer: &mut P, band: BandCode) -> Result<()> {
    trace!(bits = %band.bit_string(), "transmit bits");
    for bit in band.bits() {
        pulse(line, pacer, if bit { ONE_PULSE } else { ZERO_PULSE })?;
        pacer.sleep(BIT_GAP);
    }
    Ok(())
}

/// Wait for the acknowledgment line to go high and then low again.
///
/// Both halves share one `timeout` budget measured from the first sample.
fn await_handshake<P: Pacer>(
    ack: &mut dyn InputLine,
    pacer: &mut P,
    timeout: Duration,
) -> Result<()> {
    let start = pacer.elapsed();

    for (phase, level) in [
        (HandshakePhase::AwaitHigh, true),
        (HandshakePhase::AwaitLow, false),
    ] {
        trace!(%phase, "handshake");
        loop {
            if ack.get_value()? == level {
                break;
            }
            let waited = pacer.elapsed().saturating_sub(start);
            if waited >= timeout {
                return Err(Error::HandshakeTimeout { phase, waited });
            }
            pacer.sleep(HANDSHAKE_POLL_INTERVAL);
        }
    }

    trace!(
        waited_ms = pacer.elapsed().saturating_sub(start).as_millis(),
        "handshake complete"
    );
    Ok(())
}
