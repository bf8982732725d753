//! Scripted frequency sources, recording signalers, and counting recovery
//! actions for supervisor tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use t1ctl_core::band::BandCode;
use t1ctl_core::error::{Error, Result};
use t1ctl_core::recovery::RecoveryAction;
use t1ctl_core::signaler::BandSignaler;
use t1ctl_core::source::{FrequencyReading, FrequencySource};

/// A [`FrequencySource`] that replays a fixed list of readings.
///
/// Once the script runs out the source either keeps returning
/// [`FrequencyReading::Unavailable`], or, if built with
/// [`cancel_when_done`](ScriptedSource::cancel_when_done), cancels the given
/// token and blocks until the caller stops polling. The latter lets a test
/// run the supervisor loop to completion over an exact script.
pub struct ScriptedSource {
    readings: VecDeque<FrequencyReading>,
    cancel_when_done: Option<CancellationToken>,
    queries: Arc<AtomicU32>,
}

impl ScriptedSource {
    /// Replay `readings` in order.
    pub fn new(readings: impl IntoIterator<Item = FrequencyReading>) -> Self {
        ScriptedSource {
            readings: readings.into_iter().collect(),
            cancel_when_done: None,
            queries: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Replay frequencies in hertz.
    pub fn from_hz(freqs: &[u64]) -> Self {
        Self::new(freqs.iter().map(|&f| FrequencyReading::Hz(f)))
    }

    /// Cancel `token` when the script is exhausted.
    pub fn cancel_when_done(mut self, token: CancellationToken) -> Self {
        self.cancel_when_done = Some(token);
        self
    }

    /// Shared counter of `query_frequency` calls.
    pub fn query_counter(&self) -> Arc<AtomicU32> {
        self.queries.clone()
    }
}

#[async_trait]
impl FrequencySource for ScriptedSource {
    async fn query_frequency(&mut self) -> FrequencyReading {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(reading) = self.readings.pop_front() {
            return reading;
        }
        match &self.cancel_when_done {
            Some(token) => {
                token.cancel();
                std::future::pending::<FrequencyReading>().await
            }
            None => FrequencyReading::Unavailable,
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

#[derive(Debug, Default)]
struct SignalState {
    sent: Vec<BandCode>,
    attempts: Vec<BandCode>,
    fail_next: u32,
    releases: u32,
    released: bool,
}

/// Handle for inspecting a [`RecordingSignaler`] after it has been moved
/// into a supervisor.
#[derive(Debug, Clone, Default)]
pub struct SignalLog {
    state: Arc<Mutex<SignalState>>,
}

impl SignalLog {
    /// Bands successfully signaled, in order.
    pub fn sent(&self) -> Vec<BandCode> {
        self.lock().sent.clone()
    }

    /// Every band a signal was attempted for, including failures.
    pub fn attempts(&self) -> Vec<BandCode> {
        self.lock().attempts.clone()
    }

    /// Make the next `n` signal attempts fail with a handshake timeout.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    /// How many times the signaler was actually released.
    pub fn releases(&self) -> u32 {
        self.lock().releases
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SignalState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A [`BandSignaler`] that records what it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingSignaler {
    log: SignalLog,
}

impl RecordingSignaler {
    /// A signaler and the log handle that observes it.
    pub fn new() -> (Self, SignalLog) {
        let log = SignalLog::default();
        (RecordingSignaler { log: log.clone() }, log)
    }
}

impl BandSignaler for RecordingSignaler {
    fn signal(&mut self, band: BandCode) -> Result<()> {
        let mut state = self.log.lock();
        if state.released {
            return Err(Error::Line("signaler already released".into()));
        }
        state.attempts.push(band);
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(Error::HandshakeTimeout {
                phase: t1ctl_core::HandshakePhase::AwaitHigh,
                waited: std::time::Duration::from_millis(2000),
            });
        }
        state.sent.push(band);
        Ok(())
    }

    fn release(&mut self) {
        let mut state = self.log.lock();
        if !state.released {
            state.released = true;
            state.releases += 1;
        }
    }
}

impl Drop for RecordingSignaler {
    fn drop(&mut self) {
        self.release();
    }
}

/// A [`RecoveryAction`] that counts invocations.
#[derive(Debug, Clone, Default)]
pub struct CountingRecovery {
    runs: Arc<AtomicU32>,
    fail: bool,
}

impl CountingRecovery {
    /// A recovery action that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A recovery action that always fails.
    pub fn failing() -> Self {
        CountingRecovery {
            runs: Arc::new(AtomicU32::new(0)),
            fail: true,
        }
    }

    /// Number of times `recover` has run.
    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryAction for CountingRecovery {
    async fn recover(&mut self) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::RecoveryFailed("scripted failure".into()))
        } else {
            Ok(())
        }
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_source_replays_then_unavailable() {
        let mut source = ScriptedSource::new([
            FrequencyReading::Hz(14_074_000),
            FrequencyReading::Unavailable,
        ]);
        assert_eq!(
            source.query_frequency().await,
            FrequencyReading::Hz(14_074_000)
        );
        assert_eq!(source.query_frequency().await, FrequencyReading::Unavailable);
        assert_eq!(source.query_frequency().await, FrequencyReading::Unavailable);
        assert_eq!(source.query_counter().load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn scripted_source_cancels_when_done() {
        let token = CancellationToken::new();
        let mut source = ScriptedSource::from_hz(&[7_074_000]).cancel_when_done(token.clone());
        assert_eq!(source.query_frequency().await, FrequencyReading::Hz(7_074_000));

        tokio::select! {
            _ = source.query_frequency() => panic!("exhausted source should not return"),
            _ = token.cancelled() => {}
        }
    }

    #[test]
    fn recording_signaler_logs_and_fails_on_demand() {
        let (mut signaler, log) = RecordingSignaler::new();
        let six = BandCode::new(6).unwrap();

        log.fail_next(1);
        assert!(signaler.signal(six).is_err());
        assert!(signaler.signal(six).is_ok());

        assert_eq!(log.attempts(), vec![six, six]);
        assert_eq!(log.sent(), vec![six]);

        signaler.release();
        drop(signaler);
        assert_eq!(log.releases(), 1);
    }

    #[tokio::test]
    async fn counting_recovery() {
        let mut ok = CountingRecovery::new();
        let probe = ok.clone();
        ok.recover().await.unwrap();
        assert_eq!(probe.runs(), 1);

        let mut bad = CountingRecovery::failing();
        assert!(bad.recover().await.is_err());
        assert_eq!(bad.runs(), 1);
    }
}
