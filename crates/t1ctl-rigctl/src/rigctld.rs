//! Frequency source backed by a running `rigctld` daemon.
//!
//! This module provides [`RigctldClient`], which implements
//! [`FrequencySource`] by opening a short-lived TCP connection per query
//! attempt, sending `f\n`, and reading one reply line.
//!
//! A query makes up to [`DEFAULT_MAX_ATTEMPTS`] attempts, waiting
//! [`DEFAULT_RETRY_DELAY`] between them, each bounded by
//! [`DEFAULT_ATTEMPT_TIMEOUT`]. An `RPRT` reply counts as a failed attempt.
//!
//! # Example
//!
//! ```no_run
//! use t1ctl_rigctl::RigctldClient;
//! use t1ctl_core::FrequencySource;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let mut client = RigctldClient::new("127.0.0.1:4532")
//!     .retry_delay(Duration::from_millis(500));
//!
//! let reading = client.query_frequency().await;
//! println!("{reading}");
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use t1ctl_core::error::{Error, Result};
use t1ctl_core::source::{FrequencyReading, FrequencySource};

use crate::protocol;

/// Default rigctld listen address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:4532";

/// Default number of connect-send-receive attempts per query.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default bound on a single attempt, connect through reply.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// rigctld frequency source with per-query retry.
#[derive(Debug, Clone)]
pub struct RigctldClient {
    /// The `host:port` of the daemon.
    addr: String,
    max_attempts: u32,
    retry_delay: Duration,
    attempt_timeout: Duration,
    /// Attempts used by the most recent query.
    last_attempts: u32,
}

impl RigctldClient {
    /// A client for the daemon at `addr` with default retry settings.
    pub fn new(addr: &str) -> Self {
        RigctldClient {
            addr: addr.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            last_attempts: 0,
        }
    }

    /// Set the number of attempts per query (minimum 1, default 3).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    /// Set the wait between attempts (default 1 s).
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the per-attempt timeout (default 10 s).
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The daemon address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Number of attempts the most recent query used (0 before any query).
    pub fn attempts_last_query(&self) -> u32 {
        self.last_attempts
    }

    /// Query the frequency, retrying on failure.
    ///
    /// Returns the error from the final attempt if every attempt fails.
    pub async fn try_query(&mut self) -> Result<u64> {
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            self.last_attempts = attempt;
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.attempt().await {
                Ok(freq) => {
                    tracing::trace!(addr = %self.addr, attempt, freq_hz = freq, "rigctld reply");
                    return Ok(freq);
                }
                Err(e) => {
                    tracing::debug!(
                        addr = %self.addr,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "rigctld query attempt failed"
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::QueryFailed("no attempts made".into())))
    }

    /// One connect-send-receive exchange, bounded by the attempt timeout.
    async fn attempt(&self) -> Result<u64> {
        let exchange = async {
            let mut stream = TcpStream::connect(&self.addr)
                .await
                .map_err(|e| map_connect_error(e, &self.addr))?;

            if let Err(e) = stream.set_nodelay(true) {
                tracing::trace!(addr = %self.addr, error = %e, "Failed to set TCP_NODELAY");
            }

            stream
                .write_all(protocol::FREQ_QUERY)
                .await
                .map_err(|e| map_io_error(e, &self.addr))?;
            stream
                .flush()
                .await
                .map_err(|e| map_io_error(e, &self.addr))?;

            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            let n = reader
                .read_line(&mut line)
                .await
                .map_err(|e| map_io_error(e, &self.addr))?;
            if n == 0 {
                return Err(Error::QueryFailed(format!(
                    "{}: connection closed before reply",
                    self.addr
                )));
            }

            protocol::decode_frequency(&line)
        };

        tokio::time::timeout(self.attempt_timeout, exchange)
            .await
            .map_err(|_| {
                Error::QueryFailed(format!(
                    "{}: no reply within {} ms",
                    self.addr,
                    self.attempt_timeout.as_millis()
                ))
            })?
    }
}

#[async_trait]
impl FrequencySource for RigctldClient {
    async fn query_frequency(&mut self) -> FrequencyReading {
        match self.try_query().await {
            Ok(freq) => FrequencyReading::Hz(freq),
            Err(e) => {
                tracing::warn!(
                    addr = %self.addr,
                    attempts = self.last_attempts,
                    error = %e,
                    "rigctld frequency unavailable"
                );
                FrequencyReading::Unavailable
            }
        }
    }

    fn describe(&self) -> String {
        format!("rigctld@{}", self.addr)
    }
}

/// Map a connection-time I/O error to a query failure.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            Error::QueryFailed(format!("connection refused: {addr}"))
        }
        _ => Error::QueryFailed(format!("{addr}: connect failed: {e}")),
    }
}

/// Map a data-path I/O error to a query failure.
fn map_io_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted => {
            Error::QueryFailed(format!("{addr}: connection lost"))
        }
        _ => Error::QueryFailed(format!("{addr}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use t1ctl_test_harness::{MockRigctld, RigctldReply};

    fn fast_client(addr: &str) -> RigctldClient {
        RigctldClient::new(addr)
            .retry_delay(Duration::from_millis(10))
            .attempt_timeout(Duration::from_millis(500))
    }

    #[test]
    fn defaults() {
        let client = RigctldClient::new(DEFAULT_ADDR);
        assert_eq!(client.addr(), "127.0.0.1:4532");
        assert_eq!(client.max_attempts, 3);
        assert_eq!(client.retry_delay, Duration::from_secs(1));
        assert_eq!(client.attempt_timeout, Duration::from_secs(10));
        assert_eq!(client.attempts_last_query(), 0);
        assert_eq!(client.describe(), "rigctld@127.0.0.1:4532");
    }

    #[test]
    fn max_attempts_clamped_to_one() {
        let client = RigctldClient::new(DEFAULT_ADDR).max_attempts(0);
        assert_eq!(client.max_attempts, 1);
    }

    #[tokio::test]
    async fn first_attempt_success() {
        let mut server = MockRigctld::new().await.unwrap();
        server.reply(RigctldReply::line("14074000"));
        server.start();

        let mut client = fast_client(server.addr());
        assert_eq!(
            client.query_frequency().await,
            FrequencyReading::Hz(14_074_000)
        );
        assert_eq!(client.attempts_last_query(), 1);

        let requests = server.wait().await.unwrap();
        assert_eq!(requests, vec!["f\n".to_string()]);
    }

    #[tokio::test]
    async fn rprt_replies_are_retried() {
        let mut server = MockRigctld::new().await.unwrap();
        server.reply(RigctldReply::line("RPRT -1"));
        server.reply(RigctldReply::line("RPRT -1"));
        server.reply(RigctldReply::line("14074000"));
        server.start();

        let mut client = fast_client(server.addr());
        assert_eq!(
            client.query_frequency().await,
            FrequencyReading::Hz(14_074_000)
        );
        assert_eq!(client.attempts_last_query(), 3);

        let requests = server.wait().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut server = MockRigctld::new().await.unwrap();
        for _ in 0..3 {
            server.reply(RigctldReply::line("RPRT -1"));
        }
        server.start();

        let mut client = fast_client(server.addr());
        let err = client.try_query().await.unwrap_err();
        assert!(err.to_string().contains("RPRT -1"));
        assert_eq!(client.attempts_last_query(), 3);
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn hangup_and_garbage_count_as_failures() {
        let mut server = MockRigctld::new().await.unwrap();
        server.reply(RigctldReply::Hangup);
        server.reply(RigctldReply::line("not a number"));
        server.reply(RigctldReply::line("7074000"));
        server.start();

        let mut client = fast_client(server.addr());
        assert_eq!(client.try_query().await.unwrap(), 7_074_000);
        assert_eq!(client.attempts_last_query(), 3);
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn silent_daemon_times_out_each_attempt() {
        let mut server = MockRigctld::new().await.unwrap();
        server.reply(RigctldReply::Silent);
        server.reply(RigctldReply::line("21074000"));
        server.start();

        let mut client = RigctldClient::new(server.addr())
            .retry_delay(Duration::from_millis(10))
            .attempt_timeout(Duration::from_millis(100));
        assert_eq!(client.try_query().await.unwrap(), 21_074_000);
        assert_eq!(client.attempts_last_query(), 2);
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable() {
        // Bind and drop to get a port nobody is listening on.
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let mut client = fast_client(&addr).max_attempts(2);
        assert_eq!(client.query_frequency().await, FrequencyReading::Unavailable);
        assert_eq!(client.attempts_last_query(), 2);
    }
}
