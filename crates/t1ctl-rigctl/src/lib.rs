//! Hamlib frequency sources for t1ctl.
//!
//! This crate provides concrete implementations of the
//! [`FrequencySource`](t1ctl_core::FrequencySource) trait from `t1ctl-core`:
//!
//! - [`RigctlProcess`]: runs the `rigctl` CLI once per query
//! - [`RigctldClient`]: queries a running `rigctld` over TCP with retry
//!
//! and [`DaemonRestart`], a [`RecoveryAction`](t1ctl_core::RecoveryAction)
//! that kills and relaunches `rigctld` when it stops answering.
//!
//! # Example
//!
//! ```no_run
//! use t1ctl_rigctl::{RigctlProcess, DEFAULT_RIG_MODEL, DEFAULT_SERIAL_PORT};
//! use t1ctl_core::FrequencySource;
//!
//! # async fn example() {
//! let mut source = RigctlProcess::new(DEFAULT_RIG_MODEL, DEFAULT_SERIAL_PORT);
//! if let Some(freq) = source.query_frequency().await.hz() {
//!     println!("{freq} Hz");
//! }
//! # }
//! ```

pub mod process;
pub mod protocol;
pub mod restart;
pub mod rigctld;

pub use process::{DEFAULT_RIG_MODEL, DEFAULT_SERIAL_PORT, RigctlProcess};
pub use restart::{DEFAULT_RIGCTLD_PORT, DaemonRestart};
pub use rigctld::{DEFAULT_ADDR, RigctldClient};
