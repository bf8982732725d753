//! Consecutive-failure tracking and restart escalation.

use t1ctl_core::error::{Error, Result};
use t1ctl_core::recovery::RecoveryAction;

/// Default number of unavailable readings in a row before recovery runs.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Tracks the health of the control link and decides when to escalate.
///
/// Every unavailable reading increments the counter and every good reading
/// resets it. When the counter reaches the threshold the policy reports
/// exhaustion once and starts counting again from zero, so a source that
/// stays down triggers recovery every `threshold` polls, never on each one.
pub struct RecoveryPolicy {
    threshold: u32,
    consecutive_failures: u32,
    action: Option<Box<dyn RecoveryAction>>,
}

impl RecoveryPolicy {
    /// A policy with the given threshold (minimum 1) and no recovery action.
    pub fn new(threshold: u32) -> Self {
        RecoveryPolicy {
            threshold: threshold.max(1),
            consecutive_failures: 0,
            action: None,
        }
    }

    /// Attach the action run when the threshold is reached.
    pub fn with_action(mut self, action: Box<dyn RecoveryAction>) -> Self {
        self.action = Some(action);
        self
    }

    /// The configured threshold.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Unavailable readings since the last good one or the last escalation.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether a recovery action is attached.
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Record a good reading.
    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            tracing::debug!(
                consecutive_failures = self.consecutive_failures,
                "frequency source back"
            );
        }
        self.consecutive_failures = 0;
    }

    /// Record an unavailable reading.
    ///
    /// Returns `Err(LinkExhausted)` when this failure reaches the threshold.
    /// The counter is reset at that point, so the caller should escalate
    /// exactly once per `Err`.
    pub fn record_failure(&mut self) -> Result<u32> {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.threshold {
            let failures = self.consecutive_failures;
            self.consecutive_failures = 0;
            return Err(Error::LinkExhausted { failures });
        }
        Ok(self.consecutive_failures)
    }

    /// Run the recovery action, if any. Returns `Ok(false)` when there is
    /// nothing to run.
    pub async fn recover(&mut self) -> Result<bool> {
        match self.action.as_mut() {
            Some(action) => {
                tracing::info!(action = %action.describe(), "running recovery");
                action.recover().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONSECUTIVE_FAILURES)
    }
}

impl std::fmt::Debug for RecoveryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryPolicy")
            .field("threshold", &self.threshold)
            .field("consecutive_failures", &self.consecutive_failures)
            .field(
                "action",
                &self.action.as_ref().map(|a| a.describe()),
            )
            .finish()
    }
}
