//! t1ctl-core: Core traits, types, and error definitions for t1ctl.
//!
//! This crate defines the hardware-agnostic abstractions that the rest of
//! the workspace is built on. The tuner protocol, the supervisor, and the
//! test harness depend on these types without pulling in GPIO or Hamlib
//! specifics.
//!
//! # Key types
//!
//! - [`BandCode`] / [`classify`] -- frequency to T1 band code lookup
//! - [`OutputLine`] / [`InputLine`] -- digital lines driven by the tuner protocol
//! - [`FrequencySource`] -- where the operating frequency comes from
//! - [`BandSignaler`] -- something that can tell the tuner which band is in use
//! - [`RecoveryAction`] -- last-resort repair of a wedged frequency source
//! - [`Pacer`] -- blocking sleep plus monotonic clock for bit-banged timing
//! - [`WatchEvent`] -- supervisor state change notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod band;
pub mod error;
pub mod events;
pub mod helpers;
pub mod line;
pub mod recovery;
pub mod signaler;
pub mod source;
pub mod timing;

// Re-export key types at crate root for ergonomic `use t1ctl_core::*`.
pub use band::{BAND_TABLE, BandCode, BandEntry, BandRange, classify};
pub use error::{Error, HandshakePhase, Result};
pub use events::WatchEvent;
pub use helpers::{format_freq_mhz, format_range_mhz};
pub use line::{DataLine, InputLine, LineDirection, LineSpec, OutputLine, TunerLines};
pub use recovery::RecoveryAction;
pub use signaler::BandSignaler;
pub use source::{FrequencyReading, FrequencySource};
pub use timing::{Pacer, SystemPacer};
