//! Shared types, error definitions, and constants for the Pepper speech relay.
//!
//! Every crate in the workspace pulls its cross-cutting value types from here:
//! the backend mode tag, the conversation context, the bridge status document,
//! and the [`RelayError`] taxonomy used by all network-facing code.

pub mod conversation;
pub mod error;

pub use conversation::{ConversationContext, Role, Turn};
pub use error::{ErrorKind, RelayError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default host of the legacy runtime (a virtual robot on the local machine).
pub const DEFAULT_LEGACY_HOST: &str = "127.0.0.1";

/// Default port of the legacy runtime.
pub const DEFAULT_LEGACY_PORT: u16 = 9559;

/// Utterance relayed when the user ends the conversation.
pub const FAREWELL_TEXT: &str = "Goodbye! It was nice talking with you.";

/// Utterance relayed when no response could be generated.
pub const APOLOGY_TEXT: &str = "I'm sorry, I couldn't process that. Please try again.";

/// The communication path currently used to reach the speech sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// A legacy session held by this process.
    Direct,
    /// The HTTP bridge service, which holds the session on our behalf.
    Bridge,
    /// No sink at all; utterances are only recorded and displayed.
    Simulation,
}

impl BackendMode {
    /// Returns the string label for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Bridge => "bridge",
            Self::Simulation => "simulation",
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network address of the legacy runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTarget {
    /// Host name or IP address.
    #[serde(default = "default_legacy_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_legacy_port")]
    pub port: u16,
}

fn default_legacy_host() -> String {
    DEFAULT_LEGACY_HOST.to_string()
}

fn default_legacy_port() -> u16 {
    DEFAULT_LEGACY_PORT
}

impl Default for LegacyTarget {
    fn default() -> Self {
        Self {
            host: default_legacy_host(),
            port: default_legacy_port(),
        }
    }
}

impl LegacyTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, suitable for `TcpStream::connect`.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for LegacyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}:{}", self.host, self.port)
    }
}

/// Body of a speak request sent to the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakRequest {
    /// Already-sanitized text. Absent and empty are both rejected by the bridge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl SpeakRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Outcome of relaying one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakResult {
    /// Whether the sink accepted the utterance.
    pub spoken: bool,
    /// Classification of the failure, if any.
    pub failure: Option<ErrorKind>,
}

impl SpeakResult {
    pub fn ok() -> Self {
        Self {
            spoken: true,
            failure: None,
        }
    }

    pub fn failed(kind: ErrorKind) -> Self {
        Self {
            spoken: false,
            failure: Some(kind),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.spoken
    }
}

/// Document returned by the bridge's `GET /status`.
///
/// `pepper_ip` / `pepper_port` duplicate the target fields for older callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub status: String,
    pub connected: bool,
    pub target_host: String,
    pub target_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pepper_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pepper_port: Option<u16>,
}

impl BridgeStatus {
    pub fn new(connected: bool, target: &LegacyTarget) -> Self {
        Self {
            status: "ok".to_string(),
            connected,
            target_host: target.host.clone(),
            target_port: target.port,
            pepper_ip: Some(target.host.clone()),
            pepper_port: Some(target.port),
        }
    }
}
