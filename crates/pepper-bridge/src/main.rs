//! Pepper bridge binary.
//!
//! Owns the single legacy session and serves it over HTTP, with structured
//! logging and graceful shutdown on SIGTERM/SIGINT.
//!
//! Usage: `pepper-bridge [pepper_ip] [pepper_port] [http_port]`

use pepper_bridge::{app, config, AppState, SessionManager};
use pepper_speech::TcpLegacyConnector;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (String, &'static str) {
    if let Ok(path) = std::env::var("PEPPER_BRIDGE_CONFIG") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("pepper-bridge.toml".to_string(), "default")
}

#[tokio::main]
async fn main() {
    let (config_path, config_source) = resolve_config_path();

    let mut config = config::load_config(Some(&config_path))
        .expect("failed to load configuration — the bridge cannot start without valid config");

    let args: Vec<String> = std::env::args().skip(1).collect();
    config::apply_positional_overrides(&mut config, &args)
        .expect("usage: pepper-bridge [pepper_ip] [pepper_port] [http_port]");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    let target = config.legacy.target();
    let connector = Arc::new(TcpLegacyConnector::new(config.legacy.connect_timeout()));
    let sessions = SessionManager::new(connector, target.clone());

    // The server starts even if the robot is not reachable yet; POST /reconnect retries.
    if let Err(e) = sessions.reconnect().await {
        tracing::warn!(legacy = %target, error = %e, "initial connection failed, serving disconnected");
    }

    let app = app(AppState::new(sessions));
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, legacy = %target, "starting pepper bridge");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("pepper bridge shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
