//! GPIO character-device line handles.
//!
//! Lines are requested through `gpio-cdev` and held for the lifetime of the
//! returned handle. Dropping a handle closes its file descriptor, which
//! gives the line back to the kernel; [`release`](t1ctl_core::OutputLine::release)
//! does the same eagerly and is safe to call more than once.

use std::path::PathBuf;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use t1ctl_core::error::{Error, Result};
use t1ctl_core::line::{DataLine, InputLine, LineDirection, LineSpec, OutputLine, TunerLines};

/// Consumer label shown by `gpioinfo` for lines held by t1ctl.
pub const DEFAULT_CONSUMER: &str = "t1ctl";

/// Resolve a chip name to its device path.
///
/// Bare names like `gpiochip0` live under `/dev`; anything containing a `/`
/// is used as given.
pub fn chip_path(chip: &str) -> PathBuf {
    if chip.contains('/') {
        PathBuf::from(chip)
    } else {
        PathBuf::from("/dev").join(chip)
    }
}

/// Claims GPIO lines for the T1 interface.
#[derive(Debug, Clone)]
pub struct GpioController {
    consumer: String,
}

impl GpioController {
    /// Create a controller using [`DEFAULT_CONSUMER`] as the consumer label.
    pub fn new() -> Self {
        Self::with_consumer(DEFAULT_CONSUMER)
    }

    /// Create a controller with a custom consumer label.
    pub fn with_consumer(consumer: &str) -> Self {
        GpioController {
            consumer: consumer.to_string(),
        }
    }

    /// Claim an output line, initially driven low.
    pub fn acquire_output(&self, spec: &LineSpec) -> Result<GpioOutput> {
        expect_direction(spec, LineDirection::Output)?;
        let handle = self.request(spec, LineRequestFlags::OUTPUT)?;
        tracing::info!(line = %spec, "GPIO output line acquired");
        Ok(GpioOutput {
            handle: Some(handle),
            label: spec.to_string(),
        })
    }

    /// Claim an input line.
    pub fn acquire_input(&self, spec: &LineSpec) -> Result<GpioInput> {
        expect_direction(spec, LineDirection::Input)?;
        let handle = self.request(spec, LineRequestFlags::INPUT)?;
        tracing::info!(line = %spec, "GPIO input line acquired");
        Ok(GpioInput {
            handle: Some(handle),
            label: spec.to_string(),
        })
    }

    /// Claim both T1 lines: `tune` as an output, `data` in its own direction.
    ///
    /// If the data line cannot be claimed, the tune line is released before
    /// the error is returned.
    pub fn acquire_tuner_lines(&self, tune: &LineSpec, data: &LineSpec) -> Result<TunerLines> {
        if tune.chip == data.chip && tune.offset == data.offset {
            return Err(Error::InvalidConfig(format!(
                "tune and data lines are both {tune}"
            )));
        }

        let mut tune_line = self.acquire_output(tune)?;
        let data_line = match data.direction {
            LineDirection::Input => self
                .acquire_input(data)
                .map(|line| DataLine::Input(Box::new(line))),
            LineDirection::Output => self
                .acquire_output(data)
                .map(|line| DataLine::Output(Box::new(line))),
        };

        match data_line {
            Ok(data) => Ok(TunerLines {
                tune: Box::new(tune_line),
                data,
            }),
            Err(e) => {
                tune_line.release();
                Err(e)
            }
        }
    }

    fn request(&self, spec: &LineSpec, flags: LineRequestFlags) -> Result<LineHandle> {
        let path = chip_path(&spec.chip);
        tracing::debug!(
            chip = %path.display(),
            offset = spec.offset,
            direction = %spec.direction,
            consumer = %self.consumer,
            "Requesting GPIO line"
        );

        let mut chip = Chip::new(&path).map_err(|e| unavailable(spec, e))?;
        let line = chip.get_line(spec.offset).map_err(|e| unavailable(spec, e))?;
        line.request(flags, 0, &self.consumer)
            .map_err(|e| unavailable(spec, e))
    }
}

impl Default for GpioController {
    fn default() -> Self {
        Self::new()
    }
}

/// A claimed GPIO output line.
#[derive(Debug)]
pub struct GpioOutput {
    /// The kernel line handle, `None` after `release()`.
    handle: Option<LineHandle>,
    label: String,
}

impl OutputLine for GpioOutput {
    fn set_value(&mut self, high: bool) -> Result<()> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| Error::Line(format!("{}: already released", self.label)))?;
        handle
            .set_value(u8::from(high))
            .map_err(|e| Error::Line(format!("{}: {}", self.label, e)))
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            // Leave the tuner inactive.
            if let Err(e) = handle.set_value(0) {
                tracing::warn!(line = %self.label, error = %e, "Failed to drive line low before release");
            }
            drop(handle);
            tracing::info!(line = %self.label, "GPIO output line released");
        }
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

impl Drop for GpioOutput {
    fn drop(&mut self) {
        self.release();
    }
}

/// A claimed GPIO input line.
#[derive(Debug)]
pub struct GpioInput {
    /// The kernel line handle, `None` after `release()`.
    handle: Option<LineHandle>,
    label: String,
}

impl InputLine for GpioInput {
    fn get_value(&mut self) -> Result<bool> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| Error::Line(format!("{}: already released", self.label)))?;
        handle
            .get_value()
            .map(|v| v != 0)
            .map_err(|e| Error::Line(format!("{}: {}", self.label, e)))
    }

    fn release(&mut self) {
        if self.handle.take().is_some() {
            tracing::info!(line = %self.label, "GPIO input line released");
        }
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

impl Drop for GpioInput {
    fn drop(&mut self) {
        self.release();
    }
}

fn expect_direction(spec: &LineSpec, wanted: LineDirection) -> Result<()> {
    if spec.direction != wanted {
        return Err(Error::InvalidConfig(format!(
            "{spec} is configured as {} but was requested as {wanted}",
            spec.direction
        )));
    }
    Ok(())
}

fn unavailable(spec: &LineSpec, e: gpio_cdev::Error) -> Error {
    tracing::error!(line = %spec, error = %e, "GPIO line unavailable");
    Error::HardwareUnavailable {
        line: spec.to_string(),
        reason: e.to_string(),
    }
}
