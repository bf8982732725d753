//! Polling supervisor that keeps a T1 tuner on the rig's band.
//!
//! A [`Watcher`] owns a [`FrequencySource`](t1ctl_core::FrequencySource), a
//! [`BandSignaler`](t1ctl_core::BandSignaler), and a [`RecoveryPolicy`]. Each
//! cycle it reads the frequency, classifies it, and transmits the band code
//! only when it differs from the last one the tuner acknowledged. When the
//! source stays unavailable for too long the policy runs its recovery
//! action, once per threshold's worth of failures.
//!
//! # Architecture
//!
//! - [`supervisor`] -- the [`Watcher`] loop, cycle outcomes, and summary
//! - [`recovery`] -- consecutive-failure counting and escalation
//! - [`builder`] -- [`WatchBuilder`]

pub mod builder;
pub mod recovery;
pub mod supervisor;

pub use builder::{DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_INTERVAL, WatchBuilder};
pub use recovery::{DEFAULT_MAX_CONSECUTIVE_FAILURES, RecoveryPolicy};
pub use supervisor::{CycleOutcome, SupervisorState, WatchSummary, Watcher};
