//! The `BandSignaler` trait -- tells the tuner which band is in use.
//!
//! Signaling is synchronous and blocking: pulse widths are held with
//! blocking sleeps, and nothing else may touch the lines while a
//! transmission is in progress. The supervisor runs it on the blocking
//! pool and waits for it to finish before polling again.

use crate::band::BandCode;
use crate::error::Result;

/// Something that can deliver a band code to the T1.
pub trait BandSignaler: Send + 'static {
    /// Transmit `band`. Blocks until the whole sequence is on the wire.
    fn signal(&mut self, band: BandCode) -> Result<()>;

    /// Release the underlying lines. Idempotent.
    fn release(&mut self);
}

impl<S: BandSignaler + ?Sized> BandSignaler for Box<S> {
    fn signal(&mut self, band: BandCode) -> Result<()> {
        (**self).signal(band)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
