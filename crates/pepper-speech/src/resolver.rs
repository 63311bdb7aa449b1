//! Runtime selection of the speech path.
//!
//! Resolution is one linear pass with no retries:
//!
//! 1. Direct: only if a legacy connector is installed and supported; open a
//!    session under the connect timeout.
//! 2. Bridge: `GET /status` answers 200 within the status timeout. Only the
//!    bridge's reachability matters, not whether it currently holds a session.
//! 3. Simulation: always succeeds.
//!
//! Any failure at a step advances to the next one. Callers re-run
//! [`ConnectivityResolver::resolve`] after a relay failure.

use crate::backend::{BridgeBackend, DirectBackend, SimulationBackend, SpeechBackend};
use crate::config::ResolverConfig;
use crate::legacy::{LegacyConnector, LegacySession};
use pepper_types::RelayError;
use std::sync::Arc;

pub struct ConnectivityResolver {
    config: ResolverConfig,
    connector: Option<Arc<dyn LegacyConnector>>,
    client: reqwest::Client,
    simulation: SimulationBackend,
}

impl ConnectivityResolver {
    /// Creates a resolver without a legacy connector; the direct probe always
    /// reports the capability as unavailable.
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            connector: None,
            client: reqwest::Client::new(),
            simulation: SimulationBackend::new(),
        }
    }

    /// Installs the connector used by the direct probe.
    pub fn with_connector(mut self, connector: Arc<dyn LegacyConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The simulation backend handed out by every resolution that falls
    /// through to step 3. Its transcript survives re-resolution.
    pub fn simulation(&self) -> &SimulationBackend {
        &self.simulation
    }

    /// Probes each path in priority order and returns the first usable one.
    pub async fn resolve(&self) -> SpeechBackend {
        match self.probe_direct().await {
            Ok(session) => {
                tracing::info!(legacy = %session.target(), "resolved speech backend: direct");
                return SpeechBackend::Direct(DirectBackend::new(session));
            }
            Err(RelayError::CapabilityUnavailable(reason)) => {
                tracing::debug!(%reason, "direct mode unavailable in this process");
            }
            Err(e) => {
                tracing::info!(error = %e, "direct probe failed");
            }
        }

        match self.probe_bridge().await {
            Ok(()) => {
                tracing::info!(bridge = %self.config.bridge_url, "resolved speech backend: bridge");
                return SpeechBackend::Bridge(BridgeBackend::with_client(
                    &self.config.bridge_url,
                    self.client.clone(),
                ));
            }
            Err(e) => {
                tracing::info!(error = %e, bridge = %self.config.bridge_url, "bridge probe failed");
            }
        }

        tracing::info!("resolved speech backend: simulation");
        SpeechBackend::Simulation(self.simulation.clone())
    }

    /// Step 1: open a legacy session if this process is able to.
    pub async fn probe_direct(&self) -> Result<Arc<dyn LegacySession>, RelayError> {
        let connector = match &self.connector {
            Some(connector) if connector.is_supported() => connector,
            Some(_) => {
                return Err(RelayError::CapabilityUnavailable(
                    "legacy connector reports no SDK support".to_string(),
                ))
            }
            None => {
                return Err(RelayError::CapabilityUnavailable(
                    "no legacy connector installed".to_string(),
                ))
            }
        };

        let timeout = self.config.connect_timeout;
        tokio::time::timeout(timeout, connector.connect(&self.config.target))
            .await
            .map_err(|_| {
                RelayError::Timeout(format!(
                    "direct connect to {} exceeded {:?}",
                    self.config.target, timeout
                ))
            })?
    }

    /// Step 2: the bridge answers `GET /status` with 200.
    pub async fn probe_bridge(&self) -> Result<(), RelayError> {
        let response = self
            .client
            .get(format!("{}/status", self.config.bridge_url))
            .timeout(self.config.status_timeout)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(RelayError::Backend {
                status: response.status().as_u16(),
            })
        }
    }
}
