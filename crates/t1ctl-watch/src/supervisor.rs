//! The watch loop: poll, classify, signal on change, escalate on silence.
//!
//! One [`Watcher`] owns the frequency source, the band signaler (and with it
//! the tuner lines), and the recovery policy. Every cycle runs to completion
//! before the next begins: a band transmission always finishes before the
//! next query is issued, and cancellation is only observed while waiting on
//! the source, the poll-interval sleep, or a recovery action. The lines are
//! released exactly once when [`Watcher::run`] returns, or when the watcher
//! is dropped if it never ran.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use t1ctl_core::band::{BandCode, classify};
use t1ctl_core::error::{Error, Result};
use t1ctl_core::events::WatchEvent;
use t1ctl_core::helpers::format_freq_mhz;
use t1ctl_core::signaler::BandSignaler;
use t1ctl_core::source::{FrequencyReading, FrequencySource};

use crate::recovery::RecoveryPolicy;

/// Band state carried from one cycle to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorState {
    /// The last band code the tuner acknowledged, or `None` before the first
    /// successful transmission.
    pub previous_band: Option<BandCode>,
}

/// What a single polling cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The band matches what the tuner already has.
    Unchanged { band: BandCode, freq_hz: u64 },
    /// A new band was transmitted.
    Signaled { band: BandCode, freq_hz: u64 },
    /// A new band was detected but the transmission failed. It will be
    /// attempted again on the next cycle that reads the same band.
    SignalFailed { band: BandCode, freq_hz: u64 },
    /// No reading; `consecutive` unavailable readings so far.
    Unavailable { consecutive: u32 },
    /// The failure threshold was reached and the recovery action ran.
    Recovered { failures: u32, succeeded: bool },
    /// Cancellation arrived while the recovery action was running.
    Interrupted,
}

/// Counters reported when the watcher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Polling cycles started.
    pub cycles: u64,
    /// Band codes successfully transmitted.
    pub signals_sent: u64,
    /// Transmissions that failed.
    pub signal_failures: u64,
    /// Cycles with no frequency reading.
    pub unavailable_readings: u64,
    /// Recovery actions run (successful or not).
    pub recoveries: u64,
}

/// Polling supervisor for one rig and one tuner.
///
/// Build with [`WatchBuilder`](crate::WatchBuilder).
pub struct Watcher {
    source: Box<dyn FrequencySource>,
    signaler: Option<Box<dyn BandSignaler>>,
    policy: RecoveryPolicy,
    state: SupervisorState,
    poll_interval: Duration,
    event_tx: broadcast::Sender<WatchEvent>,
    summary: WatchSummary,
}

impl Watcher {
    pub(crate) fn new(
        source: Box<dyn FrequencySource>,
        signaler: Box<dyn BandSignaler>,
        policy: RecoveryPolicy,
        state: SupervisorState,
        poll_interval: Duration,
        event_tx: broadcast::Sender<WatchEvent>,
    ) -> Self {
        Watcher {
            source,
            signaler: Some(signaler),
            policy,
            state,
            poll_interval,
            event_tx,
            summary: WatchSummary::default(),
        }
    }

    /// Subscribe to supervisor events.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.event_tx.subscribe()
    }

    /// Current band state.
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Counters so far.
    pub fn summary(&self) -> WatchSummary {
        self.summary
    }

    /// The recovery policy and its failure counter.
    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// Time between cycles.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run one polling cycle without sleeping afterwards.
    ///
    /// Returns `Err` only for non-transient failures (the tuner lines are
    /// gone); everything else is reported through the outcome and events.
    pub async fn poll_once(&mut self) -> Result<CycleOutcome> {
        let reading = self.source.query_frequency().await;
        self.summary.cycles += 1;
        // Nothing can cancel this token; recovery always runs to completion.
        let never = CancellationToken::new();
        self.step(reading, &never).await
    }

    /// Poll until `cancel` fires or a fatal error occurs.
    ///
    /// The tuner lines are released exactly once before this returns,
    /// whichever way it exits.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<WatchSummary> {
        info!(
            source = %self.source.describe(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            recovery_threshold = self.policy.threshold(),
            "watching rig frequency"
        );

        let result = self.run_loop(&cancel).await;

        self.release();
        let _ = self.event_tx.send(WatchEvent::Stopped);

        match &result {
            Ok(()) => info!(
                cycles = self.summary.cycles,
                signals_sent = self.summary.signals_sent,
                signal_failures = self.summary.signal_failures,
                unavailable_readings = self.summary.unavailable_readings,
                recoveries = self.summary.recoveries,
                "watcher stopped"
            ),
            Err(e) => warn!(error = %e, "watcher stopped on error"),
        }

        result.map(|()| self.summary)
    }

    async fn run_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            let reading = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("cancelled while querying");
                    return Ok(());
                }

                reading = self.source.query_frequency() => reading,
            };
            self.summary.cycles += 1;

            if self.step(reading, cancel).await? == CycleOutcome::Interrupted {
                debug!("cancelled during recovery");
                return Ok(());
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("cancelled while sleeping");
                    return Ok(());
                }

                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Act on one reading.
    async fn step(
        &mut self,
        reading: FrequencyReading,
        cancel: &CancellationToken,
    ) -> Result<CycleOutcome> {
        match reading {
            FrequencyReading::Hz(freq_hz) => self.on_frequency(freq_hz).await,
            FrequencyReading::Unavailable => Ok(self.on_unavailable(cancel).await),
        }
    }

    async fn on_frequency(&mut self, freq_hz: u64) -> Result<CycleOutcome> {
        self.policy.record_success();

        let band = classify(freq_hz);
        let _ = self.event_tx.send(WatchEvent::FrequencyRead { freq_hz, band });

        if self.state.previous_band == Some(band) {
            debug!(freq_hz, band = %band, "band unchanged");
            return Ok(CycleOutcome::Unchanged { band, freq_hz });
        }

        info!(
            freq_hz,
            freq_mhz = %format_freq_mhz(freq_hz),
            band = %band,
            bits = %band.bit_string(),
            previous = ?self.state.previous_band.map(|b| b.value()),
            "band change"
        );

        match self.transmit(band).await {
            Ok(()) => {
                self.state.previous_band = Some(band);
                self.summary.signals_sent += 1;
                let _ = self.event_tx.send(WatchEvent::BandSignaled { band, freq_hz });
                info!(band = %band, "tuner signaled");
                Ok(CycleOutcome::Signaled { band, freq_hz })
            }
            Err(e) if e.is_transient() => {
                self.summary.signal_failures += 1;
                warn!(band = %band, error = %e, "band signal failed, retrying next cycle");
                let _ = self.event_tx.send(WatchEvent::SignalFailed {
                    band,
                    reason: e.to_string(),
                });
                Ok(CycleOutcome::SignalFailed { band, freq_hz })
            }
            Err(e) => Err(e),
        }
    }

    async fn on_unavailable(&mut self, cancel: &CancellationToken) -> CycleOutcome {
        self.summary.unavailable_readings += 1;

        let failures = match self.policy.record_failure() {
            Ok(consecutive) => {
                warn!(consecutive_failures = consecutive, "frequency unavailable");
                let _ = self
                    .event_tx
                    .send(WatchEvent::SourceUnavailable { consecutive });
                return CycleOutcome::Unavailable { consecutive };
            }
            Err(Error::LinkExhausted { failures }) => failures,
            Err(e) => {
                warn!(error = %e, "unexpected failure bookkeeping error");
                return CycleOutcome::Unavailable { consecutive: 0 };
            }
        };

        let _ = self.event_tx.send(WatchEvent::SourceUnavailable {
            consecutive: failures,
        });
        warn!(
            consecutive_failures = failures,
            "frequency source exhausted"
        );

        if !self.policy.has_action() {
            warn!("no recovery action configured, continuing to poll");
            return CycleOutcome::Unavailable {
                consecutive: failures,
            };
        }

        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => return CycleOutcome::Interrupted,

            result = self.policy.recover() => result,
        };

        self.summary.recoveries += 1;
        let succeeded = match result {
            Ok(_) => {
                info!(failures, "recovery complete");
                true
            }
            Err(e) => {
                warn!(failures, error = %e, "recovery failed, continuing to poll");
                false
            }
        };
        let _ = self
            .event_tx
            .send(WatchEvent::LinkRecovery { failures, succeeded });

        CycleOutcome::Recovered {
            failures,
            succeeded,
        }
    }

    /// Run one transmission on the blocking pool.
    ///
    /// The signaler is moved into the blocking task and handed back when it
    /// finishes, so it always has exactly one owner.
    async fn transmit(&mut self, band: BandCode) -> Result<()> {
        let mut signaler = self.signaler.take().ok_or_else(|| Error::HardwareUnavailable {
            line: "tuner".into(),
            reason: "signaler no longer available".into(),
        })?;

        let joined = tokio::task::spawn_blocking(move || {
            let result = signaler.signal(band);
            (signaler, result)
        })
        .await;

        match joined {
            Ok((signaler, result)) => {
                self.signaler = Some(signaler);
                result
            }
            // The signaler was dropped with the task, which released its lines.
            Err(e) => Err(Error::HardwareUnavailable {
                line: "tuner".into(),
                reason: format!("signaling task failed: {e}"),
            }),
        }
    }

    fn release(&mut self) {
        if let Some(mut signaler) = self.signaler.take() {
            signaler.release();
            debug!("tuner lines released");
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WatchBuilder;
    use async_trait::async_trait;
    use t1ctl_core::recovery::RecoveryAction;
    use t1ctl_test_harness::{CountingRecovery, RecordingSignaler, ScriptedSource, SignalLog};

    const MHZ_20M: u64 = 14_074_000;
    const MHZ_15M: u64 = 21_074_000;

    fn code(v: u8) -> BandCode {
        BandCode::new(v).unwrap()
    }

    fn watcher(source: ScriptedSource) -> (WatchBuilder, SignalLog) {
        let (signaler, log) = RecordingSignaler::new();
        let builder = WatchBuilder::new()
            .source(Box::new(source))
            .signaler(Box::new(signaler))
            .poll_interval(Duration::from_millis(1));
        (builder, log)
    }

    fn drain(rx: &mut broadcast::Receiver<WatchEvent>) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// A recovery action that never finishes.
    struct StuckRecovery;

    #[async_trait]
    impl RecoveryAction for StuckRecovery {
        async fn recover(&mut self) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        fn describe(&self) -> String {
            "stuck".into()
        }
    }

    #[tokio::test]
    async fn signals_only_on_band_change() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::from_hz(&[MHZ_20M, MHZ_20M, MHZ_20M, MHZ_15M, MHZ_15M, 0])
            .cancel_when_done(cancel.clone());
        let (builder, log) = watcher(source);
        let watcher = builder.build().unwrap();

        let summary = watcher.run(cancel).await.unwrap();

        assert_eq!(log.sent(), vec![code(6), code(8), code(0)]);
        assert_eq!(summary.cycles, 6);
        assert_eq!(summary.signals_sent, 3);
        assert_eq!(summary.signal_failures, 0);
        assert_eq!(log.releases(), 1);
    }

    #[tokio::test]
    async fn initial_band_suppresses_first_signal() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::from_hz(&[MHZ_20M, MHZ_20M, MHZ_20M, MHZ_15M, MHZ_15M, 0])
            .cancel_when_done(cancel.clone());
        let (builder, log) = watcher(source);
        let watcher = builder.initial_band(code(6)).build().unwrap();

        watcher.run(cancel).await.unwrap();
        assert_eq!(log.sent(), vec![code(8), code(0)]);
    }

    #[tokio::test]
    async fn poll_once_reports_outcomes() {
        let (builder, log) = watcher(ScriptedSource::new([
            FrequencyReading::Hz(MHZ_20M),
            FrequencyReading::Hz(14_200_000),
            FrequencyReading::Unavailable,
        ]));
        let mut watcher = builder.build().unwrap();

        assert_eq!(
            watcher.poll_once().await.unwrap(),
            CycleOutcome::Signaled {
                band: code(6),
                freq_hz: MHZ_20M
            }
        );
        assert_eq!(
            watcher.poll_once().await.unwrap(),
            CycleOutcome::Unchanged {
                band: code(6),
                freq_hz: 14_200_000
            }
        );
        assert_eq!(
            watcher.poll_once().await.unwrap(),
            CycleOutcome::Unavailable { consecutive: 1 }
        );
        assert_eq!(watcher.state().previous_band, Some(code(6)));
        assert_eq!(watcher.summary().cycles, 3);

        drop(watcher);
        assert_eq!(log.releases(), 1);
    }

    #[tokio::test]
    async fn failed_signal_is_retried_next_cycle() {
        let (builder, log) = watcher(ScriptedSource::from_hz(&[MHZ_20M, MHZ_20M, MHZ_20M]));
        let mut watcher = builder.build().unwrap();
        let mut events = watcher.subscribe();
        log.fail_next(1);

        assert_eq!(
            watcher.poll_once().await.unwrap(),
            CycleOutcome::SignalFailed {
                band: code(6),
                freq_hz: MHZ_20M
            }
        );
        assert_eq!(watcher.state().previous_band, None);
        // Exactly one attempt in the failing cycle.
        assert_eq!(log.attempts(), vec![code(6)]);

        assert!(matches!(
            watcher.poll_once().await.unwrap(),
            CycleOutcome::Signaled { .. }
        ));
        assert!(matches!(
            watcher.poll_once().await.unwrap(),
            CycleOutcome::Unchanged { .. }
        ));

        assert_eq!(log.attempts(), vec![code(6), code(6)]);
        assert_eq!(log.sent(), vec![code(6)]);
        assert_eq!(watcher.summary().signal_failures, 1);

        let events = drain(&mut events);
        assert!(events
            .iter()
            .any(|e| matches!(e, WatchEvent::SignalFailed { band, .. } if *band == code(6))));
    }

    #[tokio::test]
    async fn recovery_runs_once_at_threshold() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(std::iter::repeat(FrequencyReading::Unavailable).take(11))
            .cancel_when_done(cancel.clone());
        let recovery = CountingRecovery::new();
        let (builder, log) = watcher(source);
        let watcher = builder
            .recovery(Box::new(recovery.clone()))
            .max_consecutive_failures(10)
            .build()
            .unwrap();
        let mut events = watcher.subscribe();

        let summary = watcher.run(cancel).await.unwrap();

        assert_eq!(recovery.runs(), 1);
        assert_eq!(summary.recoveries, 1);
        assert_eq!(summary.unavailable_readings, 11);
        assert!(log.attempts().is_empty());

        let events = drain(&mut events);
        let recoveries: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, WatchEvent::LinkRecovery { .. }))
            .collect();
        assert_eq!(
            recoveries,
            vec![&WatchEvent::LinkRecovery {
                failures: 10,
                succeeded: true
            }]
        );
        assert_eq!(events.last(), Some(&WatchEvent::Stopped));
    }

    #[tokio::test]
    async fn good_reading_resets_failure_count() {
        let cancel = CancellationToken::new();
        let mut readings = vec![FrequencyReading::Unavailable; 9];
        readings.push(FrequencyReading::Hz(MHZ_20M));
        readings.extend(vec![FrequencyReading::Unavailable; 9]);
        let source = ScriptedSource::new(readings).cancel_when_done(cancel.clone());
        let recovery = CountingRecovery::new();
        let (builder, _log) = watcher(source);
        let watcher = builder.recovery(Box::new(recovery.clone())).build().unwrap();

        let summary = watcher.run(cancel).await.unwrap();
        assert_eq!(recovery.runs(), 0);
        assert_eq!(summary.unavailable_readings, 18);
    }

    #[tokio::test]
    async fn failing_recovery_keeps_polling() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            std::iter::repeat(FrequencyReading::Unavailable)
                .take(4)
                .chain([FrequencyReading::Hz(MHZ_15M)]),
        )
        .cancel_when_done(cancel.clone());
        let recovery = CountingRecovery::failing();
        let (builder, log) = watcher(source);
        let watcher = builder
            .recovery(Box::new(recovery.clone()))
            .max_consecutive_failures(2)
            .build()
            .unwrap();
        let mut events = watcher.subscribe();

        let summary = watcher.run(cancel).await.unwrap();

        assert_eq!(recovery.runs(), 2);
        assert_eq!(summary.recoveries, 2);
        assert_eq!(log.sent(), vec![code(8)]);
        assert!(drain(&mut events).contains(&WatchEvent::LinkRecovery {
            failures: 2,
            succeeded: false
        }));
    }

    #[tokio::test]
    async fn threshold_without_action_continues() {
        let (builder, _log) = watcher(ScriptedSource::new([FrequencyReading::Unavailable; 2]));
        let mut watcher = builder.max_consecutive_failures(2).build().unwrap();

        watcher.poll_once().await.unwrap();
        assert_eq!(
            watcher.poll_once().await.unwrap(),
            CycleOutcome::Unavailable { consecutive: 2 }
        );
        assert_eq!(watcher.policy().consecutive_failures(), 0);
        assert_eq!(watcher.summary().recoveries, 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_releases_once() {
        let (builder, log) = watcher(ScriptedSource::from_hz(&[MHZ_20M]));
        let watcher = builder.build().unwrap();
        let mut events = watcher.subscribe();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = watcher.run(cancel).await.unwrap();
        assert_eq!(summary.cycles, 0);
        assert!(log.attempts().is_empty());
        assert_eq!(log.releases(), 1);
        assert_eq!(drain(&mut events), vec![WatchEvent::Stopped]);
    }

    #[tokio::test]
    async fn cancelled_while_sleeping_releases_once() {
        let (signaler, log) = RecordingSignaler::new();
        let watcher = WatchBuilder::new()
            .source(Box::new(ScriptedSource::from_hz(&[MHZ_20M])))
            .signaler(Box::new(signaler))
            .poll_interval(Duration::from_secs(3600))
            .build()
            .unwrap();
        let mut events = watcher.subscribe();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(watcher.run(cancel.clone()));
        loop {
            match events.recv().await.unwrap() {
                WatchEvent::BandSignaled { .. } => break,
                _ => continue,
            }
        }
        cancel.cancel();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.signals_sent, 1);
        assert_eq!(log.releases(), 1);
    }

    #[tokio::test]
    async fn cancelled_during_recovery_releases_once() {
        let (signaler, log) = RecordingSignaler::new();
        let watcher = WatchBuilder::new()
            .source(Box::new(ScriptedSource::new([FrequencyReading::Unavailable])))
            .signaler(Box::new(signaler))
            .recovery(Box::new(StuckRecovery))
            .max_consecutive_failures(1)
            .poll_interval(Duration::from_millis(1))
            .build()
            .unwrap();
        let mut events = watcher.subscribe();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(watcher.run(cancel.clone()));
        loop {
            match events.recv().await.unwrap() {
                WatchEvent::SourceUnavailable { .. } => break,
                _ => continue,
            }
        }
        cancel.cancel();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.recoveries, 0);
        assert_eq!(log.releases(), 1);
    }
}
