//! Pepper chat binary.
//!
//! Checks the generation endpoint, resolves a speech path, then runs the
//! conversation loop on stdin/stdout.
//!
//! Usage: `pepper-chat [host] [port]`

use pepper_chat::{config, ConversationOrchestrator};
use pepper_llm::GenerationClient;
use pepper_speech::{ConnectivityResolver, TcpLegacyConnector};
use pepper_types::BackendMode;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (String, &'static str) {
    if let Ok(path) = std::env::var("PEPPER_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("pepper.toml".to_string(), "default")
}

fn describe(mode: BackendMode) -> &'static str {
    match mode {
        BackendMode::Direct => "connected to the robot directly; replies will be spoken",
        BackendMode::Bridge => "connected through the bridge; replies will be spoken",
        BackendMode::Simulation => "simulation mode; replies are printed, not spoken",
    }
}

#[tokio::main]
async fn main() {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let (config_path, config_source) = resolve_config_path();
    let mut config = config::load_config(Some(&config_path))
        .expect("failed to load configuration — check pepper.toml or PEPPER_CONFIG_PATH");

    let args: Vec<String> = std::env::args().skip(1).collect();
    config::apply_positional_overrides(&mut config, &args)
        .expect("usage: pepper-chat [host] [port]");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    println!("==================================================");
    println!("  PEPPER AI CONNECTOR");
    println!("==================================================");

    let generator = GenerationClient::new(&config.generation.base_url, &config.generation.model);

    println!("Checking generation endpoint at {} ...", generator.base_url());
    match generator.list_models().await {
        Ok(models) if models.is_empty() => {
            tracing::warn!("generation endpoint has no models installed");
            println!("Endpoint is up but has no models. Pull one, e.g. `ollama pull {}`.", generator.model());
        }
        Ok(models) => {
            let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            println!("Available models: {}", names.join(", "));
        }
        Err(e) => {
            tracing::error!(error = %e, "generation endpoint unreachable");
            eprintln!("Cannot reach the generation endpoint: {}", e);
            eprintln!("Make sure it is running (`ollama serve`) and try again.");
            std::process::exit(1);
        }
    }

    let mut resolver = ConnectivityResolver::new(config.resolver_config());
    if config.legacy.direct_enabled {
        resolver = resolver.with_connector(Arc::new(TcpLegacyConnector::new(
            config.legacy.connect_timeout(),
        )));
    }

    let mut orchestrator = ConversationOrchestrator::new(resolver, generator);
    if let Some(window) = config.conversation.history_limit {
        orchestrator = orchestrator.with_history_window(window);
    }

    let mode = orchestrator.resolve().await;
    println!("Speech: {}.", describe(mode));
    println!("Type a message to chat. Type 'quit', 'exit' or 'bye' to stop.\n");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    match orchestrator.run(stdin, &mut stdout).await {
        Ok(summary) => tracing::info!(
            turns = summary.turns,
            relays = summary.relays,
            failures = summary.failures,
            re_resolutions = summary.re_resolutions,
            final_mode = ?summary.final_mode,
            "conversation ended"
        ),
        Err(e) => {
            tracing::error!(error = %e, "conversation aborted");
            std::process::exit(1);
        }
    }
}
