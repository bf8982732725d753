//! Mock `rigctld` server for testing the socket frequency source.
//!
//! [`MockRigctld`] listens on a random localhost port and serves a script
//! of replies, one per accepted connection: it reads one request line,
//! records it, writes the scripted reply, and closes the connection. This
//! matches how the rigctld client opens a short-lived connection per query
//! attempt.
//!
//! # Example
//!
//! ```
//! use t1ctl_test_harness::{MockRigctld, RigctldReply};
//!
//! # async fn example() -> t1ctl_core::Result<()> {
//! let mut server = MockRigctld::new().await?;
//! server.reply(RigctldReply::line("RPRT -1"));
//! server.reply(RigctldReply::line("14074000"));
//! server.start();
//!
//! let addr = server.addr().to_string();
//! // ... point a RigctldClient at `addr` ...
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;

use t1ctl_core::error::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the mock does with one accepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigctldReply {
    /// Read the request, then write these bytes and close.
    Bytes(Vec<u8>),
    /// Close immediately without reading or writing.
    Hangup,
    /// Read the request and never answer (until the client gives up).
    Silent,
}

impl RigctldReply {
    /// A reply line; a trailing newline is added.
    pub fn line(text: &str) -> Self {
        RigctldReply::Bytes(format!("{text}\n").into_bytes())
    }
}

/// A scripted rigctld stand-in.
pub struct MockRigctld {
    /// The address the server is listening on (e.g., "127.0.0.1:54321").
    addr: String,
    /// Listener, moved into the server task by `start()`.
    listener: Option<TcpListener>,
    /// Ordered replies, one per connection.
    replies: VecDeque<RigctldReply>,
    /// Handle to the server task once started.
    server_handle: Option<JoinHandle<std::result::Result<Vec<String>, String>>>,
}

impl MockRigctld {
    /// Bind to a random localhost port. Connections are not served until
    /// [`start`](MockRigctld::start) is called.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::QueryFailed(format!("failed to bind mock rigctld: {e}")))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();

        Ok(Self {
            addr,
            listener: Some(listener),
            replies: VecDeque::new(),
            server_handle: None,
        })
    }

    /// Queue the reply for the next connection.
    pub fn reply(&mut self, reply: RigctldReply) {
        self.replies.push_back(reply);
    }

    /// The `host:port` to connect to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Start serving the queued replies in a background task.
    ///
    /// Calling `start()` twice has no further effect.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let replies: Vec<RigctldReply> = self.replies.drain(..).collect();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();

            for (i, reply) in replies.into_iter().enumerate() {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| format!("connection {i}: accept failed: {e}"))?;

                if reply == RigctldReply::Hangup {
                    drop(stream);
                    continue;
                }

                let mut stream = BufReader::new(stream);
                let mut request = String::new();
                stream
                    .read_line(&mut request)
                    .await
                    .map_err(|e| format!("connection {i}: read error: {e}"))?;
                requests.push(request);

                match reply {
                    RigctldReply::Bytes(bytes) => {
                        let stream = stream.get_mut();
                        stream
                            .write_all(&bytes)
                            .await
                            .map_err(|e| format!("connection {i}: write error: {e}"))?;
                        stream
                            .flush()
                            .await
                            .map_err(|e| format!("connection {i}: flush error: {e}"))?;
                    }
                    RigctldReply::Silent => {
                        // Hold the connection open until the client hangs up.
                        let mut rest = String::new();
                        let _ = stream.read_line(&mut rest).await;
                    }
                    RigctldReply::Hangup => unreachable!("handled before reading"),
                }
            }

            Ok(requests)
        });

        self.server_handle = Some(handle);
    }

    /// Wait for every scripted connection to be served and return the
    /// request lines received, in order.
    pub async fn wait(self) -> std::result::Result<Vec<String>, String> {
        match self.server_handle {
            Some(handle) => handle
                .await
                .map_err(|e| format!("server task panicked: {e}"))?,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn serves_one_reply_per_connection() {
        let mut server = MockRigctld::new().await.unwrap();
        server.reply(RigctldReply::line("RPRT -1"));
        server.reply(RigctldReply::line("7074000"));
        server.start();

        for expected in ["RPRT -1\n", "7074000\n"] {
            let mut stream = TcpStream::connect(server.addr()).await.unwrap();
            stream.write_all(b"f\n").await.unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).await.unwrap();
            assert_eq!(reply, expected);
        }

        let requests = server.wait().await.unwrap();
        assert_eq!(requests, vec!["f\n".to_string(), "f\n".to_string()]);
    }

    #[tokio::test]
    async fn hangup_closes_without_reply() {
        let mut server = MockRigctld::new().await.unwrap();
        server.reply(RigctldReply::Hangup);
        server.start();

        let mut stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut reply = Vec::new();
        let _ = stream.read_to_end(&mut reply).await;
        assert!(reply.is_empty());

        assert!(server.wait().await.unwrap().is_empty());
    }
}
