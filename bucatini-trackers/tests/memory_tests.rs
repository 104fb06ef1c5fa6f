//! Tests for the in-memory recording tracker.

use bson::{doc, Bson};
use bucatini_core::dispatch::apply_watches;
use bucatini_core::reference::DocumentReference;
use bucatini_core::tracker::Tracker;
use bucatini_core::watch::Watch;
use bucatini_trackers::memory::MemoryTracker;
use std::sync::Arc;

#[tokio::test]
async fn records_invocations_in_order() {
    let tracker = MemoryTracker::new();
    let watch = Watch::new("a.b", "a.c");

    for i in 0..3 {
        let reference = DocumentReference::new("a", "b", Bson::Int32(i));
        tracker
            .handle_insert(&watch, &doc! { "_id": i }, &reference)
            .await
            .unwrap();
    }

    let inserts = tracker.inserts().await;
    assert_eq!(inserts.len(), 3);
    for (i, record) in inserts.iter().enumerate() {
        assert_eq!(record.reference.id, Bson::Int32(i as i32));
    }
}

#[tokio::test]
async fn separates_handler_kinds() {
    let tracker = MemoryTracker::new();
    let watch = Watch::new("a.b", "a.c");
    let reference = DocumentReference::new("a", "b", Bson::Int32(1));

    tracker
        .handle_insert(&watch, &doc! { "_id": 1 }, &reference)
        .await
        .unwrap();
    tracker
        .handle_update(&watch, &doc! { "$set": { "x": 1 } }, &doc! { "_id": 1 })
        .await
        .unwrap();
    tracker
        .handle_remove(&watch, &doc! { "_id": 1 }, &doc! { "_id": 1 })
        .await
        .unwrap();

    assert_eq!(tracker.inserts().await.len(), 1);
    assert_eq!(tracker.updates().await.len(), 1);
    assert_eq!(tracker.removes().await.len(), 1);
    assert_eq!(tracker.invocation_count().await, 3);
}

#[tokio::test]
async fn clear_drops_all_records() {
    let tracker = MemoryTracker::new();
    let watch = Watch::new("a.b", "a.c");
    let reference = DocumentReference::new("a", "b", Bson::Int32(1));

    tracker
        .handle_insert(&watch, &doc! { "_id": 1 }, &reference)
        .await
        .unwrap();
    tracker.clear().await;

    assert_eq!(tracker.invocation_count().await, 0);
}

#[tokio::test]
async fn clones_share_the_record_store() {
    let tracker = MemoryTracker::new();
    let handle = tracker.clone();
    let watch = Watch::new("a.b", "a.c");
    let reference = DocumentReference::new("a", "b", Bson::Int32(1));

    handle
        .handle_insert(&watch, &doc! { "_id": 1 }, &reference)
        .await
        .unwrap();

    assert_eq!(tracker.inserts().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn safe_to_share_across_tasks() {
    let tracker = Arc::new(MemoryTracker::new());
    let watch = Watch::new("a.b", "a.c");

    let mut handles = Vec::new();
    for i in 0..8 {
        let tracker = Arc::clone(&tracker);
        let watch = watch.clone();
        handles.push(tokio::spawn(async move {
            let reference = DocumentReference::new("a", "b", Bson::Int32(i));
            tracker
                .handle_insert(&watch, &doc! { "_id": i }, &reference)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(tracker.inserts().await.len(), 8);
}

#[tokio::test]
async fn works_end_to_end_with_the_dispatcher_pass() {
    let tracker = MemoryTracker::new();
    let watches = vec![Watch::new("shop.users", "shop.comments")];
    let entry = doc! {
        "ns": "shop.users",
        "op": "i",
        "o": { "_id": 42, "name": "Carol" },
    };

    apply_watches(&entry, &watches, &tracker).await;

    let inserts = tracker.inserts().await;
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].reference.id, Bson::Int32(42));
    assert_eq!(inserts[0].watch.target_collection, "shop.users");
}
