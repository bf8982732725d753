//! Digital line traits for the T1 interface.
//!
//! The T1 is wired to the controller through two digital lines: a tune line
//! that is always an output, and a data line that is either an input
//! (carrying the tuner's acknowledgment pulse) or a second output
//! (carrying the band bits), depending on how the board is wired.
//!
//! Output and input lines are separate traits, so writing to an input line
//! does not compile. Implementations exist for Linux GPIO character devices
//! (`t1ctl-gpio`) and for virtual-time mocks (`t1ctl-test-harness`).

use std::fmt;

use crate::error::Result;

/// Direction a line is requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineDirection {
    /// Driven by the controller.
    Output,
    /// Read by the controller.
    Input,
}

impl fmt::Display for LineDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineDirection::Output => write!(f, "output"),
            LineDirection::Input => write!(f, "input"),
        }
    }
}

/// Identifies one physical line and the direction it must be claimed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    /// GPIO chip name (`gpiochip0`) or device path (`/dev/gpiochip0`).
    pub chip: String,
    /// Line offset within the chip.
    pub offset: u32,
    /// Requested direction.
    pub direction: LineDirection,
}

impl LineSpec {
    /// An output line spec.
    pub fn output(chip: &str, offset: u32) -> Self {
        LineSpec {
            chip: chip.to_string(),
            offset,
            direction: LineDirection::Output,
        }
    }

    /// An input line spec.
    pub fn input(chip: &str, offset: u32) -> Self {
        LineSpec {
            chip: chip.to_string(),
            offset,
            direction: LineDirection::Input,
        }
    }
}

impl fmt::Display for LineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chip, self.offset)
    }
}

/// A line the controller drives high or low.
///
/// Every call touches the hardware immediately; callers own all timing.
pub trait OutputLine: Send {
    /// Drive the line high (`true`) or low (`false`).
    fn set_value(&mut self, high: bool) -> Result<()>;

    /// Give the line back to the system. Idempotent.
    fn release(&mut self);

    /// Identifier used in log output.
    fn label(&self) -> String;
}

/// A line the controller samples.
pub trait InputLine: Send {
    /// Read the current level: `true` for high.
    fn get_value(&mut self) -> Result<bool>;

    /// Give the line back to the system. Idempotent.
    fn release(&mut self);

    /// Identifier used in log output.
    fn label(&self) -> String;
}

/// The second T1 line, whose direction depends on the board wiring.
pub enum DataLine {
    /// Acknowledgment input from the tuner (handshake wiring).
    Input(Box<dyn InputLine>),
    /// Band-bit output to the tuner (fixed-delay wiring).
    Output(Box<dyn OutputLine>),
}

impl DataLine {
    /// Direction this line was acquired in.
    pub fn direction(&self) -> LineDirection {
        match self {
            DataLine::Input(_) => LineDirection::Input,
            DataLine::Output(_) => LineDirection::Output,
        }
    }

    /// Release the underlying line. Idempotent.
    pub fn release(&mut self) {
        match self {
            DataLine::Input(line) => line.release(),
            DataLine::Output(line) => line.release(),
        }
    }

    /// Identifier used in log output.
    pub fn label(&self) -> String {
        match self {
            DataLine::Input(line) => line.label(),
            DataLine::Output(line) => line.label(),
        }
    }
}

/// Both T1 lines, acquired together at startup.
pub struct TunerLines {
    /// Tune (activation) line, always an output.
    pub tune: Box<dyn OutputLine>,
    /// Data line, input or output depending on the wiring.
    pub data: DataLine,
}

impl TunerLines {
    /// Release both lines. Idempotent.
    pub fn release(&mut self) {
        self.tune.release();
        self.data.release();
    }
}
