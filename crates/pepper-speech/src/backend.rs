use crate::config::{normalize_base_url, BRIDGE_SPEAK_TIMEOUT, BRIDGE_STATUS_TIMEOUT};
use crate::legacy::LegacySession;
use crate::sanitize::preview;
use pepper_types::{BackendMode, BridgeStatus, RelayError, SpeakRequest, SpeakResult};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Number of characters of an utterance included in log lines.
const LOG_PREVIEW_CHARS: usize = 100;

/// A resolved path to the speech sink.
#[derive(Debug, Clone)]
pub enum SpeechBackend {
    Direct(DirectBackend),
    Bridge(BridgeBackend),
    Simulation(SimulationBackend),
}

impl SpeechBackend {
    pub fn mode(&self) -> BackendMode {
        match self {
            Self::Direct(_) => BackendMode::Direct,
            Self::Bridge(_) => BackendMode::Bridge,
            Self::Simulation(_) => BackendMode::Simulation,
        }
    }

    /// Relays already-sanitized text to the sink.
    ///
    /// Never returns an error: failures are reported through [`SpeakResult`].
    pub async fn speak(&self, text: &str) -> SpeakResult {
        match self {
            Self::Direct(backend) => backend.speak(text).await,
            Self::Bridge(backend) => backend.speak(text).await,
            Self::Simulation(backend) => backend.speak(text),
        }
    }
}

/// Speaks over a legacy session held by this process.
#[derive(Debug, Clone)]
pub struct DirectBackend {
    session: Arc<dyn LegacySession>,
}

impl DirectBackend {
    pub fn new(session: Arc<dyn LegacySession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<dyn LegacySession> {
        &self.session
    }

    pub async fn speak(&self, text: &str) -> SpeakResult {
        tracing::info!(
            mode = "direct",
            legacy = %self.session.target(),
            "speaking: {}",
            preview(text, LOG_PREVIEW_CHARS)
        );
        match self.session.say(text).await {
            Ok(()) => SpeakResult::ok(),
            Err(e) => {
                tracing::warn!(error = %e, "direct speech call failed");
                SpeakResult::failed(e.kind())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpeakAck {
    #[serde(default)]
    status: Option<String>,
}

/// Speaks through the HTTP bridge service.
#[derive(Debug, Clone)]
pub struct BridgeBackend {
    base_url: String,
    client: reqwest::Client,
    speak_timeout: Duration,
}

impl BridgeBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            client,
            speak_timeout: BRIDGE_SPEAK_TIMEOUT,
        }
    }

    pub fn with_speak_timeout(mut self, timeout: Duration) -> Self {
        self.speak_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the bridge's current view of its legacy session.
    pub async fn status(&self) -> Result<BridgeStatus, RelayError> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .timeout(BRIDGE_STATUS_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Backend {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<BridgeStatus>().await?)
    }

    async fn post_speak(&self, text: &str) -> Result<(), RelayError> {
        let response = self
            .client
            .post(format!("{}/speak", self.base_url))
            .json(&SpeakRequest::new(text))
            .timeout(self.speak_timeout)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(RelayError::Backend {
                status: status.as_u16(),
            });
        }

        let ack: SpeakAck = response.json().await?;
        match ack.status.as_deref() {
            Some("ok") => Ok(()),
            other => Err(RelayError::Protocol(format!(
                "unexpected speak acknowledgement: {:?}",
                other
            ))),
        }
    }

    pub async fn speak(&self, text: &str) -> SpeakResult {
        tracing::info!(
            mode = "bridge",
            bridge = %self.base_url,
            "speaking: {}",
            preview(text, LOG_PREVIEW_CHARS)
        );
        match self.post_speak(text).await {
            Ok(()) => SpeakResult::ok(),
            Err(e) => {
                tracing::warn!(error = %e, bridge = %self.base_url, "bridge speak failed");
                SpeakResult::failed(e.kind())
            }
        }
    }
}

/// Records utterances instead of speaking them.
#[derive(Debug, Clone, Default)]
pub struct SimulationBackend {
    transcript: Arc<Mutex<Vec<String>>>,
}

impl SimulationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speak(&self, text: &str) -> SpeakResult {
        tracing::info!(mode = "simulation", "robot would say: {}", text);
        match self.transcript.lock() {
            Ok(mut transcript) => transcript.push(text.to_string()),
            Err(poisoned) => poisoned.into_inner().push(text.to_string()),
        }
        SpeakResult::ok()
    }

    /// Every utterance recorded so far, oldest first.
    pub fn transcript(&self) -> Vec<String> {
        match self.transcript.lock() {
            Ok(transcript) => transcript.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

