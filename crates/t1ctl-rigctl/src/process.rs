//! Frequency source that runs the `rigctl` CLI once per query.
//!
//! Each query spawns `rigctl -m <model> -r <port> f`, waits for it to exit
//! (bounded by a timeout), and parses the first line of its standard
//! output. A non-zero exit, a timeout, or unparseable output yields
//! [`FrequencyReading::Unavailable`].

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use t1ctl_core::error::{Error, Result};
use t1ctl_core::source::{FrequencyReading, FrequencySource};

use crate::protocol;

/// Default Hamlib rig model number.
pub const DEFAULT_RIG_MODEL: &str = "2002";

/// Default serial device the rig is attached to.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";

/// Default bound on one `rigctl` run.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawns `rigctl` to read the current frequency.
#[derive(Debug, Clone)]
pub struct RigctlProcess {
    program: String,
    rig_model: String,
    serial_port: String,
    timeout: Duration,
}

impl RigctlProcess {
    /// A source for `rig_model` on `serial_port` using the `rigctl` on `PATH`.
    pub fn new(rig_model: &str, serial_port: &str) -> Self {
        RigctlProcess {
            program: "rigctl".to_string(),
            rig_model: rig_model.to_string(),
            serial_port: serial_port.to_string(),
            timeout: DEFAULT_PROCESS_TIMEOUT,
        }
    }

    /// Run a different executable instead of `rigctl`.
    pub fn program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    /// Set the timeout for one run (default 10 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command-line arguments passed to the program.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-m".to_string(),
            self.rig_model.clone(),
            "-r".to_string(),
            self.serial_port.clone(),
            protocol::FREQ_COMMAND.to_string(),
        ]
    }

    /// Run the program once and parse its output.
    pub async fn try_query(&self) -> Result<u64> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                Error::QueryFailed(format!(
                    "{} did not exit within {} ms",
                    self.program,
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| Error::QueryFailed(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::QueryFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let first = stdout.lines().next().unwrap_or("");
        protocol::decode_frequency(first)
    }
}

#[async_trait]
impl FrequencySource for RigctlProcess {
    async fn query_frequency(&mut self) -> FrequencyReading {
        match self.try_query().await {
            Ok(freq) => FrequencyReading::Hz(freq),
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "rigctl frequency unavailable");
                FrequencyReading::Unavailable
            }
        }
    }

    fn describe(&self) -> String {
        format!(
            "{} -m {} -r {}",
            self.program, self.rig_model, self.serial_port
        )
    }
}
