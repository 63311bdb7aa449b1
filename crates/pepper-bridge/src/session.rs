//! Ownership of the bridge's single legacy session.
//!
//! Invariants:
//! - At most one session is installed at a time; `reconnect` is the only writer.
//! - Speak calls are serialized; the legacy speech call is not reentrant.
//! - The session lock is only held long enough to clone or swap the handle;
//!   status reads never wait behind an in-flight speak. A speak that started
//!   before a replacement finishes on the session it started with.
//! - Reconnects are serialized and coalesced: a caller that queued behind an
//!   in-flight attempt receives that attempt's outcome instead of dialing again.

use pepper_speech::{preview, LegacyConnector, LegacySession};
use pepper_types::{BridgeStatus, LegacyTarget, RelayError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Number of characters of an utterance included in log lines.
const LOG_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Default)]
struct ReconnectGate {
    last_outcome: Option<Result<(), RelayError>>,
}

pub struct SessionManager {
    target: LegacyTarget,
    connector: Arc<dyn LegacyConnector>,
    session: RwLock<Option<Arc<dyn LegacySession>>>,
    speak_lock: Mutex<()>,
    gate: Mutex<ReconnectGate>,
    completed_attempts: AtomicU64,
}

impl SessionManager {
    /// Creates a manager in the disconnected state.
    pub fn new(connector: Arc<dyn LegacyConnector>, target: LegacyTarget) -> Self {
        Self {
            target,
            connector,
            session: RwLock::new(None),
            speak_lock: Mutex::new(()),
            gate: Mutex::new(ReconnectGate::default()),
            completed_attempts: AtomicU64::new(0),
        }
    }

    pub fn target(&self) -> &LegacyTarget {
        &self.target
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Current session state. Never dials.
    pub async fn status(&self) -> BridgeStatus {
        BridgeStatus::new(self.is_connected().await, &self.target)
    }

    /// Number of connect attempts that have run to completion.
    pub fn completed_attempts(&self) -> u64 {
        self.completed_attempts.load(Ordering::Acquire)
    }

    /// Opens a new session and installs it in place of the current one.
    ///
    /// On failure the current session, if any, stays installed.
    pub async fn reconnect(&self) -> Result<(), RelayError> {
        let observed = self.completed_attempts.load(Ordering::Acquire);
        let mut gate = self.gate.lock().await;

        if self.completed_attempts.load(Ordering::Acquire) != observed {
            if let Some(outcome) = gate.last_outcome.clone() {
                tracing::debug!("reconnect coalesced with the attempt that just finished");
                return outcome;
            }
        }

        let outcome = match self.connector.connect(&self.target).await {
            Ok(session) => {
                *self.session.write().await = Some(session);
                tracing::info!(legacy = %self.target, "legacy session established");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(legacy = %self.target, error = %e, "failed to connect to legacy runtime");
                Err(e)
            }
        };

        gate.last_outcome = Some(outcome.clone());
        self.completed_attempts.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Forwards `text` verbatim to the legacy speech call.
    pub async fn speak(&self, text: &str) -> Result<(), RelayError> {
        let _turn = self.speak_lock.lock().await;
        let session = self.session.read().await.clone().ok_or_else(|| {
            RelayError::Connection(format!("not connected to {}", self.target))
        })?;

        tracing::info!("speaking: {}", preview(text, LOG_PREVIEW_CHARS));
        session.say(text).await.map_err(|e| {
            tracing::warn!(error = %e, "legacy speech call failed");
            e
        })
    }
}
