//! Linux GPIO lines for the T1 tuner interface.
//!
//! This crate provides concrete implementations of the
//! [`OutputLine`](t1ctl_core::OutputLine) and
//! [`InputLine`](t1ctl_core::InputLine) traits from `t1ctl-core` on top of
//! the GPIO character device (`/dev/gpiochipN`):
//!
//! - [`GpioController`]: claims lines by [`LineSpec`](t1ctl_core::LineSpec)
//! - [`GpioOutput`] / [`GpioInput`]: claimed lines, released on drop
//!
//! # Example
//!
//! ```no_run
//! use t1ctl_core::LineSpec;
//! use t1ctl_gpio::GpioController;
//!
//! # fn example() -> t1ctl_core::Result<()> {
//! let gpio = GpioController::new();
//! let lines = gpio.acquire_tuner_lines(
//!     &LineSpec::output("gpiochip0", 17),
//!     &LineSpec::input("gpiochip0", 18),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod line;

pub use line::{DEFAULT_CONSUMER, GpioController, GpioInput, GpioOutput, chip_path};
