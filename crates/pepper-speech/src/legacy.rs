//! Sessions with the legacy robot runtime.
//!
//! The runtime's SDK cannot be loaded by this process directly, so the
//! session is expressed as two traits. [`TcpLegacyConnector`] is the bundled
//! implementation: a line-oriented TCP session where each utterance is one
//! UTF-8 line and the runtime answers `ok` once it has been spoken.

use crate::config::{DEFAULT_CONNECT_TIMEOUT, LEGACY_SAY_TIMEOUT};
use async_trait::async_trait;
use pepper_types::{LegacyTarget, RelayError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// An open session with the legacy runtime.
#[async_trait]
pub trait LegacySession: Send + Sync + fmt::Debug {
    /// Speaks `text` and returns once the runtime has finished.
    ///
    /// Implementations must serialize concurrent calls; the underlying speech
    /// service is not reentrant.
    async fn say(&self, text: &str) -> Result<(), RelayError>;

    /// The address this session was opened against.
    fn target(&self) -> &LegacyTarget;
}

/// Opens sessions with the legacy runtime.
#[async_trait]
pub trait LegacyConnector: Send + Sync {
    /// Whether this process can host a legacy session at all.
    fn is_supported(&self) -> bool {
        true
    }

    async fn connect(&self, target: &LegacyTarget) -> Result<Arc<dyn LegacySession>, RelayError>;
}

/// Connector for the line-oriented TCP session.
#[derive(Debug, Clone)]
pub struct TcpLegacyConnector {
    connect_timeout: Duration,
    say_timeout: Duration,
}

impl Default for TcpLegacyConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            say_timeout: LEGACY_SAY_TIMEOUT,
        }
    }
}

impl TcpLegacyConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..Default::default()
        }
    }

    pub fn with_say_timeout(mut self, timeout: Duration) -> Self {
        self.say_timeout = timeout;
        self
    }
}

#[async_trait]
impl LegacyConnector for TcpLegacyConnector {
    async fn connect(&self, target: &LegacyTarget) -> Result<Arc<dyn LegacySession>, RelayError> {
        tracing::info!(legacy = %target, "connecting to legacy runtime");

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(target.authority()))
            .await
            .map_err(|_| {
                RelayError::Timeout(format!(
                    "connect to {} exceeded {} seconds",
                    target,
                    self.connect_timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| RelayError::Connection(format!("cannot connect to {}: {}", target, e)))?;

        // Utterances are small and latency-sensitive.
        let _ = stream.set_nodelay(true);

        tracing::info!(legacy = %target, "connected to legacy runtime");

        Ok(Arc::new(TcpLegacySession {
            target: target.clone(),
            stream: Mutex::new(BufReader::new(stream)),
            say_timeout: self.say_timeout,
            desynced: AtomicBool::new(false),
        }))
    }
}

/// Session over a single TCP stream.
///
/// An exchange cut short by a timeout or I/O error leaves an unread reply on
/// the wire, so the session is marked desynchronized and refuses further
/// utterances until it is replaced.
pub struct TcpLegacySession {
    target: LegacyTarget,
    stream: Mutex<BufReader<TcpStream>>,
    say_timeout: Duration,
    desynced: AtomicBool,
}

impl fmt::Debug for TcpLegacySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpLegacySession")
            .field("target", &self.target)
            .field("say_timeout", &self.say_timeout)
            .field("desynced", &self.desynced.load(Ordering::Acquire))
            .finish()
    }
}

/// Encodes one utterance as a single wire line.
fn encode_line(text: &str) -> String {
    let mut line: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    line.push('\n');
    line
}

impl TcpLegacySession {
    async fn exchange(&self, line: &str) -> Result<String, RelayError> {
        let mut stream = self.stream.lock().await;

        stream
            .get_mut()
            .write_all(line.as_bytes())
            .await
            .map_err(|e| RelayError::Connection(format!("write to {} failed: {}", self.target, e)))?;
        stream
            .get_mut()
            .flush()
            .await
            .map_err(|e| RelayError::Connection(format!("flush to {} failed: {}", self.target, e)))?;

        let mut reply = String::new();
        let read = stream
            .read_line(&mut reply)
            .await
            .map_err(|e| RelayError::Connection(format!("read from {} failed: {}", self.target, e)))?;
        if read == 0 {
            return Err(RelayError::Connection(format!(
                "legacy runtime at {} closed the session",
                self.target
            )));
        }

        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl LegacySession for TcpLegacySession {
    async fn say(&self, text: &str) -> Result<(), RelayError> {
        if self.desynced.load(Ordering::Acquire) {
            return Err(RelayError::Connection(format!(
                "session with {} lost sync after an interrupted exchange; reconnect required",
                self.target
            )));
        }

        let line = encode_line(text);
        let outcome = tokio::time::timeout(self.say_timeout, self.exchange(&line))
            .await
            .map_err(|_| {
                RelayError::Timeout(format!(
                    "utterance not acknowledged within {:?}",
                    self.say_timeout
                ))
            })
            .and_then(|reply| reply);

        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                self.desynced.store(true, Ordering::Release);
                tracing::warn!(legacy = %self.target, error = %e, "legacy session desynchronized");
                return Err(e);
            }
        };

        if reply.eq_ignore_ascii_case("ok") {
            Ok(())
        } else {
            Err(RelayError::Protocol(format!(
                "legacy runtime rejected utterance: {}",
                reply
            )))
        }
    }

    fn target(&self) -> &LegacyTarget {
        &self.target
    }
}
