use pepper_types::LegacyTarget;
use std::time::Duration;

/// Deadline for opening a direct legacy session during a probe.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Deadline for the bridge `GET /status` probe.
pub const BRIDGE_STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline for one `POST /speak` relayed through the bridge.
pub const BRIDGE_SPEAK_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for one utterance over a direct legacy session.
pub const LEGACY_SAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default base URL of the bridge service.
pub const DEFAULT_BRIDGE_URL: &str = "http://localhost:5000";

/// Inputs of one connectivity resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Address used by the direct probe.
    pub target: LegacyTarget,
    pub connect_timeout: Duration,
    /// Base URL of the bridge service, without a trailing slash.
    pub bridge_url: String,
    pub status_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            target: LegacyTarget::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            status_timeout: BRIDGE_STATUS_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    pub fn new(target: LegacyTarget, bridge_url: impl Into<String>) -> Self {
        Self {
            target,
            bridge_url: normalize_base_url(&bridge_url.into()),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }
}

/// Strips trailing slashes so paths can be appended with `format!`.
pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
