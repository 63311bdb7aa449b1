use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use pepper_speech::{
    ConnectivityResolver, LegacyConnector, LegacySession, ResolverConfig, SpeechBackend,
};
use pepper_types::{BackendMode, LegacyTarget, RelayError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Debug)]
struct RecordingSession {
    target: LegacyTarget,
    spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl LegacySession for RecordingSession {
    async fn say(&self, text: &str) -> Result<(), RelayError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn target(&self) -> &LegacyTarget {
        &self.target
    }
}

struct FakeConnector {
    supported: bool,
    succeed: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeConnector {
    fn new(supported: bool, succeed: bool) -> Self {
        Self {
            supported,
            succeed,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LegacyConnector for FakeConnector {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn connect(&self, target: &LegacyTarget) -> Result<Arc<dyn LegacySession>, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.succeed {
            Ok(Arc::new(RecordingSession {
                target: target.clone(),
                spoken: Mutex::new(Vec::new()),
            }))
        } else {
            Err(RelayError::Connection("connection refused".to_string()))
        }
    }
}

/// Starts a stub bridge whose `/status` answers with `status_code` and counts hits.
async fn spawn_bridge(status_code: StatusCode) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));

    async fn status(
        State((hits, code)): State<(Arc<AtomicUsize>, StatusCode)>,
    ) -> (StatusCode, Json<Value>) {
        hits.fetch_add(1, Ordering::SeqCst);
        (
            code,
            Json(json!({
                "status": "ok",
                "connected": false,
                "target_host": "127.0.0.1",
                "target_port": 9559
            })),
        )
    }

    let app = Router::new()
        .route("/status", get(status))
        .with_state((hits.clone(), status_code));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), hits)
}

/// Returns a URL on which nothing is listening.
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[tokio::test]
async fn direct_wins_when_session_opens() {
    let (bridge_url, hits) = spawn_bridge(StatusCode::OK).await;
    let connector = Arc::new(FakeConnector::new(true, true));

    let resolver = ConnectivityResolver::new(ResolverConfig::new(
        LegacyTarget::default(),
        &bridge_url,
    ))
    .with_connector(connector.clone());

    let backend = resolver.resolve().await;
    assert_eq!(backend.mode(), BackendMode::Direct);
    assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 0, "bridge must not be probed");

    assert!(backend.speak("hello").await.is_ok());
}

#[tokio::test]
async fn bridge_selected_when_direct_fails() {
    let (bridge_url, hits) = spawn_bridge(StatusCode::OK).await;
    let connector = Arc::new(FakeConnector::new(true, false));

    let resolver = ConnectivityResolver::new(ResolverConfig::new(
        LegacyTarget::default(),
        &bridge_url,
    ))
    .with_connector(connector.clone());

    let backend = resolver.resolve().await;
    assert_eq!(backend.mode(), BackendMode::Bridge);
    assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bridge_selected_without_connector() {
    let (bridge_url, _hits) = spawn_bridge(StatusCode::OK).await;

    let resolver =
        ConnectivityResolver::new(ResolverConfig::new(LegacyTarget::default(), &bridge_url));

    let err = resolver.probe_direct().await.unwrap_err();
    assert!(matches!(err, RelayError::CapabilityUnavailable(_)));
    assert_eq!(resolver.resolve().await.mode(), BackendMode::Bridge);
}

#[tokio::test]
async fn unsupported_connector_is_never_dialed() {
    let url = dead_url().await;
    let connector = Arc::new(FakeConnector::new(false, true));

    let resolver = ConnectivityResolver::new(ResolverConfig::new(LegacyTarget::default(), &url))
        .with_connector(connector.clone());

    let backend = resolver.resolve().await;
    assert_eq!(backend.mode(), BackendMode::Simulation);
    assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn simulation_when_nothing_reachable() {
    let url = dead_url().await;
    let resolver = ConnectivityResolver::new(ResolverConfig::new(LegacyTarget::default(), &url))
        .with_connector(Arc::new(FakeConnector::new(true, false)));

    let backend = resolver.resolve().await;
    assert_eq!(backend.mode(), BackendMode::Simulation);

    for text in ["one", "two", "three"] {
        assert!(backend.speak(text).await.is_ok());
    }
    assert_eq!(resolver.simulation().transcript(), vec!["one", "two", "three"]);
}

#[tokio::test]
async fn non_200_status_is_not_a_usable_bridge() {
    let (bridge_url, hits) = spawn_bridge(StatusCode::SERVICE_UNAVAILABLE).await;
    let resolver =
        ConnectivityResolver::new(ResolverConfig::new(LegacyTarget::default(), &bridge_url));

    let backend = resolver.resolve().await;
    assert_eq!(backend.mode(), BackendMode::Simulation);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slow_direct_connect_times_out_and_falls_through() {
    let (bridge_url, _hits) = spawn_bridge(StatusCode::OK).await;
    let mut connector = FakeConnector::new(true, true);
    connector.delay = Duration::from_secs(5);

    let config = ResolverConfig::new(LegacyTarget::default(), &bridge_url)
        .with_connect_timeout(Duration::from_millis(100));
    let resolver = ConnectivityResolver::new(config).with_connector(Arc::new(connector));

    let err = resolver.probe_direct().await.unwrap_err();
    assert!(matches!(err, RelayError::Timeout(_)), "got {:?}", err);

    match resolver.resolve().await {
        SpeechBackend::Bridge(bridge) => assert_eq!(bridge.base_url(), bridge_url),
        other => panic!("expected bridge backend, got {:?}", other.mode()),
    }
}

#[tokio::test]
async fn each_resolution_probes_again() {
    let (bridge_url, hits) = spawn_bridge(StatusCode::OK).await;
    let resolver =
        ConnectivityResolver::new(ResolverConfig::new(LegacyTarget::default(), &bridge_url));

    resolver.resolve().await;
    resolver.resolve().await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
