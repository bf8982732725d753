//! t1ctl-test-harness: Test utilities for t1ctl.
//!
//! This crate provides [`MockBench`] for deterministic, virtual-time testing
//! of the T1 signaling protocol without GPIO hardware, [`MockRigctld`] for
//! testing the rigctld client over a real socket, and scripted sources,
//! signalers, and recovery actions for supervisor tests.

pub mod mock_lines;
pub mod mock_rigctld;
pub mod scripted;

pub use mock_lines::{
    InputScript, MockBench, MockInputLine, MockOutputLine, Pulse, VirtualClock, VirtualPacer, Write,
};
pub use mock_rigctld::{MockRigctld, RigctldReply};
pub use scripted::{CountingRecovery, RecordingSignaler, ScriptedSource, SignalLog};
