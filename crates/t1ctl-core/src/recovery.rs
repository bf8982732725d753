//! The `RecoveryAction` trait -- last-resort repair of a frequency source.

use async_trait::async_trait;

use crate::error::Result;

/// An action run when the frequency source has failed too many times in a
/// row, e.g. killing and relaunching a wedged `rigctld`.
#[async_trait]
pub trait RecoveryAction: Send {
    /// Perform the recovery. Includes any settle time the action needs
    /// before the source can be queried again.
    async fn recover(&mut self) -> Result<()>;

    /// Short description for log output.
    fn describe(&self) -> String;
}
