//! Tests for tailer configuration and the live tail loop.
//!
//! The loop tests require a real MongoDB replica set (the oplog only exists
//! under replication) and are `#[ignore]`d so plain `cargo test` stays green
//! without infrastructure. Run them against a local deployment with:
//!
//! ```bash
//! cargo test --package bucatini-core --test tailer_tests -- --ignored
//! ```

use async_trait::async_trait;
use bson::{doc, Document};
use bucatini_core::reference::DocumentReference;
use bucatini_core::tailer::{TailError, Tailer, TailerConfig};
use bucatini_core::tracker::{Tracker, TrackerError};
use bucatini_core::watch::Watch;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[test]
fn builder_requires_uri() {
    let result = TailerConfig::builder()
        .watch(Watch::new("a.b", "a.c"))
        .build();

    assert!(matches!(result, Err(TailError::Configuration(_))));
}

#[test]
fn builder_requires_at_least_one_watch() {
    let result = TailerConfig::builder()
        .mongodb_uri("mongodb://localhost:27017")
        .build();

    assert!(matches!(result, Err(TailError::Configuration(_))));
}

#[test]
fn builder_rejects_zero_idle_timeout() {
    let result = TailerConfig::builder()
        .mongodb_uri("mongodb://localhost:27017")
        .watch(Watch::new("a.b", "a.c"))
        .idle_timeout(Duration::ZERO)
        .build();

    assert!(matches!(result, Err(TailError::Configuration(_))));
}

#[test]
fn builder_rejects_zero_max_in_flight() {
    let result = TailerConfig::builder()
        .mongodb_uri("mongodb://localhost:27017")
        .watch(Watch::new("a.b", "a.c"))
        .max_in_flight(0)
        .build();

    assert!(matches!(result, Err(TailError::Configuration(_))));
}

#[test]
fn builder_applies_defaults() {
    let before = chrono::Utc::now();
    let config = TailerConfig::builder()
        .mongodb_uri("mongodb://localhost:27017")
        .watch(Watch::new("a.b", "a.c"))
        .build()
        .unwrap();

    assert_eq!(config.idle_timeout, Duration::from_secs(1));
    assert_eq!(config.max_in_flight, None);
    assert_eq!(config.oplog_namespace.full_name(), "local.oplog.rs");
    assert!(config.start_time >= before);
    assert!(config.start_time <= chrono::Utc::now());
}

#[test]
fn builder_accepts_custom_oplog_namespace() {
    let config = TailerConfig::builder()
        .mongodb_uri("mongodb://localhost:27017")
        .watch(Watch::new("a.b", "a.c"))
        .oplog_namespace("testlog", "entries")
        .build()
        .unwrap();

    assert_eq!(config.oplog_namespace.full_name(), "testlog.entries");
}

/// Tracker that only counts insert deliveries.
#[derive(Debug, Default)]
struct CountingTracker {
    inserts: AtomicUsize,
}

#[async_trait]
impl Tracker for CountingTracker {
    async fn handle_insert(
        &self,
        _: &Watch,
        _: &Document,
        _: &DocumentReference,
    ) -> Result<(), TrackerError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_update(
        &self,
        _: &Watch,
        _: &Document,
        _: &Document,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn handle_remove(
        &self,
        _: &Watch,
        _: &Document,
        _: &Document,
    ) -> Result<(), TrackerError> {
        Ok(())
    }
}

/// Best-effort log output for the ignored live tests; repeated calls are fine.
fn init_test_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .ok();
}

async fn wait_for_inserts(tracker: &CountingTracker, expected: usize) -> bool {
    tokio::time::timeout(Duration::from_secs(10), async {
        while tracker.inserts.load(Ordering::SeqCst) < expected {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .is_ok()
}

// Requires a replica set at localhost:27017; the oplog only exists under
// replication.
#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires MongoDB
async fn tails_live_inserts_and_stops_cleanly() {
    init_test_logging();
    let tracker = Arc::new(CountingTracker::default());
    let config = TailerConfig::builder()
        .mongodb_uri("mongodb://localhost:27017/?replicaSet=rs0")
        .watch(Watch::new("bucatini_test.users", "bucatini_test.comments"))
        .build()
        .unwrap();

    let tailer = Tailer::connect(config, Arc::clone(&tracker)).await.unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { tailer.run(shutdown_rx, false).await });

    // give the cursor a moment to open past "now"
    tokio::time::sleep(Duration::from_millis(500)).await;

    let client = mongodb::Client::with_uri_str("mongodb://localhost:27017/?replicaSet=rs0")
        .await
        .unwrap();
    let users = client
        .database("bucatini_test")
        .collection::<Document>("users");
    users.insert_one(doc! { "name": "Alice" }).await.unwrap();

    assert!(wait_for_inserts(&tracker, 1).await, "insert never delivered");

    shutdown_tx.send(()).unwrap();
    let outcome = handle.await.unwrap();
    assert!(outcome.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires MongoDB
async fn rescan_redelivers_retained_history() {
    init_test_logging();
    let client = mongodb::Client::with_uri_str("mongodb://localhost:27017/?replicaSet=rs0")
        .await
        .unwrap();
    let users = client
        .database("bucatini_test")
        .collection::<Document>("users");
    users.insert_one(doc! { "name": "Bob" }).await.unwrap();

    // start_time is now, so without rescan this insert would be skipped
    let tracker = Arc::new(CountingTracker::default());
    let config = TailerConfig::builder()
        .mongodb_uri("mongodb://localhost:27017/?replicaSet=rs0")
        .watch(Watch::new("bucatini_test.users", "bucatini_test.comments"))
        .build()
        .unwrap();

    let tailer = Tailer::connect(config, Arc::clone(&tracker)).await.unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { tailer.run(shutdown_rx, true).await });

    assert!(
        wait_for_inserts(&tracker, 1).await,
        "retained history never redelivered"
    );

    shutdown_tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn connect_fails_fast_on_unreachable_deployment() {
    init_test_logging();
    let config = TailerConfig::builder()
        .mongodb_uri("mongodb://localhost:1/?serverSelectionTimeoutMS=500&connectTimeoutMS=500")
        .watch(Watch::new("a.b", "a.c"))
        .build()
        .unwrap();

    let result = Tailer::connect(config, Arc::new(CountingTracker::default())).await;
    assert!(matches!(result, Err(TailError::Connection(_))));
}
