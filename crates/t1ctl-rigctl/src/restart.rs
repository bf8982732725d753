//! Recovery action that restarts a wedged `rigctld`.
//!
//! The restart kills every process named after the daemon, waits for the
//! serial port to be let go, launches a fresh daemon detached from this
//! process, and gives it time to open the rig before polling resumes.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use t1ctl_core::error::{Error, Result};
use t1ctl_core::recovery::RecoveryAction;

/// Default TCP port `rigctld` listens on.
pub const DEFAULT_RIGCTLD_PORT: u16 = 4532;

/// Default wait after the kill before relaunching.
pub const DEFAULT_KILL_SETTLE: Duration = Duration::from_secs(1);

/// Default wait after launching before the next query.
pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_secs(2);

/// `pkill` exit status meaning "no process matched".
const NO_MATCH_STATUS: i32 = 1;

/// Kill-and-relaunch of the `rigctld` daemon.
#[derive(Debug, Clone)]
pub struct DaemonRestart {
    daemon: String,
    kill_program: String,
    rig_model: String,
    serial_port: String,
    tcp_port: u16,
    kill_settle: Duration,
    startup_grace: Duration,
}

impl DaemonRestart {
    /// Restart `rigctld` for `rig_model` on `serial_port`.
    pub fn new(rig_model: &str, serial_port: &str) -> Self {
        DaemonRestart {
            daemon: "rigctld".to_string(),
            kill_program: "pkill".to_string(),
            rig_model: rig_model.to_string(),
            serial_port: serial_port.to_string(),
            tcp_port: DEFAULT_RIGCTLD_PORT,
            kill_settle: DEFAULT_KILL_SETTLE,
            startup_grace: DEFAULT_STARTUP_GRACE,
        }
    }

    /// Launch a different daemon executable.
    pub fn daemon(mut self, daemon: &str) -> Self {
        self.daemon = daemon.to_string();
        self
    }

    /// Use a different program to kill the old daemon.
    pub fn kill_program(mut self, program: &str) -> Self {
        self.kill_program = program.to_string();
        self
    }

    /// TCP port passed to the relaunched daemon (default 4532).
    pub fn tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    /// Set the kill-settle and startup-grace waits.
    pub fn delays(mut self, kill_settle: Duration, startup_grace: Duration) -> Self {
        self.kill_settle = kill_settle;
        self.startup_grace = startup_grace;
        self
    }

    /// Arguments for the kill program.
    pub fn kill_args(&self) -> Vec<String> {
        vec!["-x".to_string(), self.daemon.clone()]
    }

    /// Arguments for the relaunched daemon.
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            "-m".to_string(),
            self.rig_model.clone(),
            "-r".to_string(),
            self.serial_port.clone(),
            "-t".to_string(),
            self.tcp_port.to_string(),
        ]
    }

    async fn kill(&self) -> Result<()> {
        let status = Command::new(&self.kill_program)
            .args(self.kill_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                Error::RecoveryFailed(format!("failed to run {}: {e}", self.kill_program))
            })?;

        match status.code() {
            Some(0) => Ok(()),
            Some(NO_MATCH_STATUS) => {
                tracing::debug!(daemon = %self.daemon, "no running daemon to kill");
                Ok(())
            }
            _ => Err(Error::RecoveryFailed(format!(
                "{} -x {} exited with {status}",
                self.kill_program, self.daemon
            ))),
        }
    }

    fn launch(&self) -> Result<()> {
        // The child is not waited on; tokio reaps it in the background.
        let child = Command::new(&self.daemon)
            .args(self.launch_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::RecoveryFailed(format!("failed to launch {}: {e}", self.daemon)))?;

        tracing::info!(daemon = %self.daemon, pid = ?child.id(), "daemon relaunched");
        Ok(())
    }
}

#[async_trait]
impl RecoveryAction for DaemonRestart {
    async fn recover(&mut self) -> Result<()> {
        tracing::info!(
            daemon = %self.daemon,
            rig_model = %self.rig_model,
            serial_port = %self.serial_port,
            "restarting daemon"
        );

        self.kill().await?;
        tokio::time::sleep(self.kill_settle).await;
        self.launch()?;
        tokio::time::sleep(self.startup_grace).await;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("restart {} on port {}", self.daemon, self.tcp_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(restart: DaemonRestart) -> DaemonRestart {
        restart.delays(Duration::from_millis(1), Duration::from_millis(1))
    }

    #[test]
    fn command_lines() {
        let restart = DaemonRestart::new("2002", "/dev/ttyACM0");
        assert_eq!(restart.kill_args(), vec!["-x", "rigctld"]);
        assert_eq!(
            restart.launch_args(),
            vec!["-m", "2002", "-r", "/dev/ttyACM0", "-t", "4532"]
        );
        assert_eq!(restart.describe(), "restart rigctld on port 4532");

        let restart = restart.tcp_port(4600);
        assert_eq!(restart.launch_args().last().map(String::as_str), Some("4600"));
    }

    #[tokio::test]
    async fn restart_succeeds_with_stand_in_programs() {
        let mut restart = quick(
            DaemonRestart::new("2002", "/dev/ttyACM0")
                .kill_program("true")
                .daemon("true"),
        );
        restart.recover().await.unwrap();
    }

    #[tokio::test]
    async fn no_match_exit_status_is_tolerated() {
        // `false` exits with status 1, the same as pkill finding nothing.
        let mut restart = quick(
            DaemonRestart::new("2002", "/dev/ttyACM0")
                .kill_program("false")
                .daemon("true"),
        );
        restart.recover().await.unwrap();
    }

    #[tokio::test]
    async fn missing_daemon_fails_recovery() {
        let mut restart = quick(
            DaemonRestart::new("2002", "/dev/ttyACM0")
                .kill_program("true")
                .daemon("/nonexistent/rigctld"),
        );
        let err = restart.recover().await.unwrap_err();
        assert!(matches!(err, Error::RecoveryFailed(_)));
    }

    #[tokio::test]
    async fn missing_kill_program_fails_recovery() {
        let mut restart = quick(
            DaemonRestart::new("2002", "/dev/ttyACM0").kill_program("/nonexistent/pkill"),
        );
        let err = restart.recover().await.unwrap_err();
        assert!(matches!(err, Error::RecoveryFailed(_)));
    }
}
