//! Concurrency tests for the bridge SessionManager.
//!
//! These tests verify that reconnects are coalesced, that a failed
//! reconnect leaves the manager usable, that speech is serialized, and
//! that status reads stay responsive while speech is in flight.

use async_trait::async_trait;
use pepper_bridge::SessionManager;
use pepper_speech::{LegacyConnector, LegacySession};
use pepper_types::{LegacyTarget, RelayError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct SlowSession {
    target: LegacyTarget,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    say_delay: Duration,
}

#[async_trait]
impl LegacySession for SlowSession {
    async fn say(&self, _text: &str) -> Result<(), RelayError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.say_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn target(&self) -> &LegacyTarget {
        &self.target
    }
}

/// Counts dials; each dial takes `delay` and succeeds while `reachable` is set.
struct CountingConnector {
    dials: AtomicUsize,
    delay: Duration,
    reachable: AtomicBool,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    say_delay: Duration,
}

impl CountingConnector {
    fn new(delay: Duration, reachable: bool) -> Self {
        Self {
            dials: AtomicUsize::new(0),
            delay,
            reachable: AtomicBool::new(reachable),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            say_delay: Duration::from_millis(10),
        }
    }

    fn with_say_delay(mut self, delay: Duration) -> Self {
        self.say_delay = delay;
        self
    }
}

#[async_trait]
impl LegacyConnector for CountingConnector {
    async fn connect(&self, target: &LegacyTarget) -> Result<Arc<dyn LegacySession>, RelayError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(RelayError::Connection("refused".to_string()));
        }
        Ok(Arc::new(SlowSession {
            target: target.clone(),
            in_flight: self.in_flight.clone(),
            max_in_flight: self.max_in_flight.clone(),
            say_delay: self.say_delay,
        }))
    }
}

fn target() -> LegacyTarget {
    LegacyTarget::new("127.0.0.1", 9559)
}

#[tokio::test]
async fn test_concurrent_reconnects_share_one_dial() {
    let connector = Arc::new(CountingConnector::new(Duration::from_millis(200), true));
    let manager = Arc::new(SessionManager::new(connector.clone(), target()));

    // Start one attempt and let it get in flight before piling on.
    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.reconnect().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move { manager.reconnect().await }));
    }

    first.await.expect("task should not panic").unwrap();
    for handle in handles {
        handle.await.expect("task should not panic").unwrap();
    }

    assert_eq!(connector.dials.load(Ordering::SeqCst), 1);
    assert_eq!(manager.completed_attempts(), 1);
    assert!(manager.is_connected().await);
}

#[tokio::test]
async fn test_sequential_reconnects_each_dial() {
    let connector = Arc::new(CountingConnector::new(Duration::ZERO, true));
    let manager = SessionManager::new(connector.clone(), target());

    manager.reconnect().await.unwrap();
    manager.reconnect().await.unwrap();
    manager.reconnect().await.unwrap();

    assert_eq!(connector.dials.load(Ordering::SeqCst), 3);
    assert_eq!(manager.completed_attempts(), 3);
}

#[tokio::test]
async fn test_failed_reconnect_then_recovery() {
    let connector = Arc::new(CountingConnector::new(Duration::ZERO, false));
    let manager = SessionManager::new(connector.clone(), target());

    let err = manager.reconnect().await.unwrap_err();
    assert!(matches!(err, RelayError::Connection(_)));
    assert!(!manager.status().await.connected);
    assert!(manager.speak("hello").await.is_err());

    connector.reachable.store(true, Ordering::SeqCst);
    manager.reconnect().await.unwrap();

    let status = manager.status().await;
    assert!(status.connected);
    manager.speak("hello").await.unwrap();
}

#[tokio::test]
async fn test_failed_reconnect_keeps_existing_session() {
    let connector = Arc::new(CountingConnector::new(Duration::ZERO, true));
    let manager = SessionManager::new(connector.clone(), target());
    manager.reconnect().await.unwrap();

    connector.reachable.store(false, Ordering::SeqCst);
    assert!(manager.reconnect().await.is_err());

    assert!(manager.is_connected().await);
    manager.speak("still here").await.unwrap();
}

#[tokio::test]
async fn test_concurrent_speech_is_serialized() {
    let connector = Arc::new(CountingConnector::new(Duration::ZERO, true));
    let manager = Arc::new(SessionManager::new(connector.clone(), target()));
    manager.reconnect().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.speak(&format!("utterance {i}")).await
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic").unwrap();
    }

    assert_eq!(connector.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_status_does_not_wait_for_speech_or_queued_reconnect() {
    let connector = Arc::new(
        CountingConnector::new(Duration::from_millis(100), true)
            .with_say_delay(Duration::from_secs(3)),
    );
    let manager = Arc::new(SessionManager::new(connector.clone(), target()));
    manager.reconnect().await.unwrap();

    let speech = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.speak("a long sentence").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let reconnect = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.reconnect().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    let status = manager.status().await;
    let elapsed = started.elapsed();

    assert!(status.connected);
    assert!(elapsed < Duration::from_millis(500), "status took {:?}", elapsed);

    // The replacement does not wait for the speech either.
    reconnect.await.expect("task should not panic").unwrap();
    assert!(!speech.is_finished());
    speech.await.expect("task should not panic").unwrap();
    assert_eq!(connector.dials.load(Ordering::SeqCst), 2);
}
