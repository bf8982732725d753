//! Virtual-time mock lines for deterministic testing of the T1 protocol.
//!
//! A [`MockBench`] holds a [`VirtualClock`] and a shared write log. Lines
//! and pacers created from the same bench share both, so a test can drive a
//! full signaling sequence instantly and then inspect exactly when each
//! edge happened.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use t1ctl_core::{OutputLine, Pacer};
//! use t1ctl_test_harness::MockBench;
//!
//! let bench = MockBench::new();
//! let mut tune = bench.output("tune");
//! let mut pacer = bench.pacer();
//!
//! tune.set_value(true).unwrap();
//! pacer.sleep(Duration::from_millis(500));
//! tune.set_value(false).unwrap();
//!
//! let pulses = bench.pulses("tune");
//! assert_eq!(pulses.len(), 1);
//! assert_eq!(pulses[0].width, Duration::from_millis(500));
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use t1ctl_core::error::{Error, Result};
use t1ctl_core::line::{InputLine, OutputLine};
use t1ctl_core::timing::Pacer;

/// A shared, manually advanced clock.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Arc<Mutex<Duration>>,
}

impl VirtualClock {
    /// A clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        *lock(&self.now)
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *lock(&self.now) += by;
    }
}

/// [`Pacer`] whose sleeps advance a [`VirtualClock`] instead of blocking.
#[derive(Debug, Clone)]
pub struct VirtualPacer {
    clock: VirtualClock,
}

impl VirtualPacer {
    /// A pacer driving `clock`.
    pub fn new(clock: VirtualClock) -> Self {
        VirtualPacer { clock }
    }
}

impl Pacer for VirtualPacer {
    fn sleep(&mut self, duration: Duration) {
        self.clock.advance(duration);
    }

    fn elapsed(&self) -> Duration {
        self.clock.now()
    }
}

/// One recorded `set_value` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Write {
    /// Virtual time of the call.
    pub at: Duration,
    /// Level written.
    pub high: bool,
}

/// A completed high pulse reconstructed from the write log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// When the line went high.
    pub start: Duration,
    /// How long it stayed high.
    pub width: Duration,
}

/// Level of a mock input line over virtual time.
#[derive(Debug, Clone)]
pub enum InputScript {
    /// Always reads this level.
    Constant(bool),
    /// Low, except high for `high_at <= t < low_at`.
    Pulse {
        /// Rising edge.
        high_at: Duration,
        /// Falling edge.
        low_at: Duration,
    },
}

impl InputScript {
    /// A line stuck at `level`.
    pub fn constant(level: bool) -> Self {
        InputScript::Constant(level)
    }

    /// A single high pulse between two absolute virtual times.
    pub fn pulse(high_at: Duration, low_at: Duration) -> Self {
        InputScript::Pulse { high_at, low_at }
    }

    fn level_at(&self, t: Duration) -> bool {
        match self {
            InputScript::Constant(level) => *level,
            InputScript::Pulse { high_at, low_at } => t >= *high_at && t < *low_at,
        }
    }
}

#[derive(Debug, Default)]
struct BenchState {
    writes: HashMap<String, Vec<Write>>,
    reads: HashMap<String, usize>,
    releases: HashMap<String, usize>,
    failing: HashSet<String>,
}

/// Shared clock and logs for a set of mock lines.
#[derive(Debug, Clone, Default)]
pub struct MockBench {
    clock: VirtualClock,
    state: Arc<Mutex<BenchState>>,
}

impl MockBench {
    /// A fresh bench at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared clock.
    pub fn clock(&self) -> VirtualClock {
        self.clock.clone()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// A pacer on the shared clock.
    pub fn pacer(&self) -> VirtualPacer {
        VirtualPacer::new(self.clock.clone())
    }

    /// A mock output line named `name`.
    pub fn output(&self, name: &str) -> MockOutputLine {
        lock(&self.state).writes.entry(name.to_string()).or_default();
        MockOutputLine {
            name: name.to_string(),
            bench: self.clone(),
            released: false,
        }
    }

    /// A mock input line named `name` following `script`.
    pub fn input(&self, name: &str, script: InputScript) -> MockInputLine {
        lock(&self.state).reads.entry(name.to_string()).or_default();
        MockInputLine {
            name: name.to_string(),
            script,
            bench: self.clone(),
            released: false,
        }
    }

    /// Make every subsequent read or write on `name` fail.
    pub fn fail_line(&self, name: &str) {
        lock(&self.state).failing.insert(name.to_string());
    }

    /// All writes to `name`, in order.
    pub fn writes(&self, name: &str) -> Vec<Write> {
        lock(&self.state)
            .writes
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of samples taken from input `name`.
    pub fn reads(&self, name: &str) -> usize {
        lock(&self.state).reads.get(name).copied().unwrap_or(0)
    }

    /// Last level written to `name`, if any.
    pub fn level(&self, name: &str) -> Option<bool> {
        self.writes(name).last().map(|w| w.high)
    }

    /// Completed high pulses on output `name`.
    pub fn pulses(&self, name: &str) -> Vec<Pulse> {
        let mut pulses = Vec::new();
        let mut rose_at: Option<Duration> = None;
        for w in self.writes(name) {
            match (w.high, rose_at) {
                (true, None) => rose_at = Some(w.at),
                (false, Some(start)) => {
                    pulses.push(Pulse {
                        start,
                        width: w.at - start,
                    });
                    rose_at = None;
                }
                _ => {}
            }
        }
        pulses
    }

    /// How many times `name` was actually released (repeat calls excluded).
    pub fn releases(&self, name: &str) -> usize {
        lock(&self.state).releases.get(name).copied().unwrap_or(0)
    }

    fn is_failing(&self, name: &str) -> bool {
        lock(&self.state).failing.contains(name)
    }

    fn record_write(&self, name: &str, high: bool) {
        let at = self.clock.now();
        lock(&self.state)
            .writes
            .entry(name.to_string())
            .or_default()
            .push(Write { at, high });
    }

    fn record_read(&self, name: &str) {
        *lock(&self.state).reads.entry(name.to_string()).or_default() += 1;
    }

    fn record_release(&self, name: &str) {
        *lock(&self.state)
            .releases
            .entry(name.to_string())
            .or_default() += 1;
    }
}

/// Mock [`OutputLine`] recording every write with its virtual time.
#[derive(Debug)]
pub struct MockOutputLine {
    name: String,
    bench: MockBench,
    released: bool,
}

impl OutputLine for MockOutputLine {
    fn set_value(&mut self, high: bool) -> Result<()> {
        if self.released {
            return Err(Error::Line(format!("{}: already released", self.name)));
        }
        if self.bench.is_failing(&self.name) {
            return Err(Error::Line(format!("{}: injected failure", self.name)));
        }
        self.bench.record_write(&self.name, high);
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.bench.record_release(&self.name);
        }
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Drop for MockOutputLine {
    fn drop(&mut self) {
        self.release();
    }
}

/// Mock [`InputLine`] whose level follows an [`InputScript`].
#[derive(Debug)]
pub struct MockInputLine {
    name: String,
    script: InputScript,
    bench: MockBench,
    released: bool,
}

impl InputLine for MockInputLine {
    fn get_value(&mut self) -> Result<bool> {
        if self.released {
            return Err(Error::Line(format!("{}: already released", self.name)));
        }
        if self.bench.is_failing(&self.name) {
            return Err(Error::Line(format!("{}: injected failure", self.name)));
        }
        self.bench.record_read(&self.name);
        Ok(self.script.level_at(self.bench.now()))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.bench.record_release(&self.name);
        }
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Drop for MockInputLine {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread should not hide the state from the assertions.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
