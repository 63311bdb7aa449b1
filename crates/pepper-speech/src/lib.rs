//! Speech relay for the Pepper robot.
//!
//! Turns generated text into something a legacy speech sink can say and
//! decides, at runtime, how to reach that sink. Three paths exist and exactly
//! one is used at a time:
//!
//! - **Direct**: this process holds a legacy session itself.
//! - **Bridge**: a `pepper-bridge` process holds the session and is driven
//!   over HTTP.
//! - **Simulation**: no sink; utterances are recorded and logged.
//!
//! [`ConnectivityResolver`] probes them in that order and hands back the first
//! usable [`SpeechBackend`].

pub mod backend;
pub mod config;
pub mod legacy;
pub mod resolver;
pub mod sanitize;

pub use backend::{BridgeBackend, DirectBackend, SimulationBackend, SpeechBackend};
pub use config::ResolverConfig;
pub use legacy::{LegacyConnector, LegacySession, TcpLegacyConnector, TcpLegacySession};
pub use resolver::ConnectivityResolver;
pub use sanitize::{preview, sanitize};
