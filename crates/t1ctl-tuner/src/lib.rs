//! t1ctl-tuner: the T1 band-select wire protocol.
//!
//! The T1 learns the current band from a short bit-banged sequence on its
//! tune and data lines:
//!
//! 1. a 500 ms activation pulse on the tune line wakes the tuner;
//! 2. a synchronization phase: either the tuner's acknowledgment pulse on
//!    the data input followed by 10 ms of silence ([`SignalingVariant::Handshake`]),
//!    or a flat 60 ms wait ([`SignalingVariant::FixedDelay`]);
//! 3. the 4-bit band code, most significant bit first, pulse-width encoded:
//!    a `1` is a 4 ms high pulse, a `0` a 1.5 ms high pulse, each followed
//!    by 1.5 ms low.
//!
//! With handshake wiring the bits go out on the tune line, since the data
//! line is the tuner's acknowledgment input. With fixed-delay wiring they go
//! out on the data line and are followed by one more 1.5 ms pulse.
//!
//! The variant is fixed when the [`T1Signaler`] is constructed, together
//! with the lines it drives.

pub mod signaling;

pub use signaling::{SignalingVariant, T1Signaler};
