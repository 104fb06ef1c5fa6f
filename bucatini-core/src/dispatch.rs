// Copyright 2025 Bucatini Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Watch matching and concurrent handler dispatch.
//!
//! The tail loop hands each observed oplog entry to a [`Dispatcher`], which
//! runs the match-and-invoke pass on its own tokio task. Tasks are
//! fire-and-forget: the read loop never waits on handler work, and handler
//! invocations for different entries may complete out of order. Each task
//! owns its entry outright (the loop transfers the deep copy), shares the
//! watch list behind an `Arc`, and reaches the store through the tracker's
//! own connection handle — nothing is mutably shared with the read path.
//!
//! By default the number of in-flight tasks is unbounded, trading memory for
//! throughput on the assumption that handler work is idempotent and cheap
//! relative to log volume. Deployments with heavier handlers can cap it with
//! [`Dispatcher::new`]'s `max_in_flight`, which backpressures the read loop
//! through a semaphore instead of accumulating tasks.
//!
//! The match rules per watch are:
//!
//! - **insert** on the target collection → `handle_insert` with a reference
//!   built from the inserted document's own id;
//! - **update** on the target collection → `handle_insert` with the update's
//!   modifier document and a reference built from the *selector's* id;
//!   independently, **update** on the track collection → `handle_update`.
//!   Both fire when a watch's two sides name the same namespace;
//! - **delete** on the track collection → `handle_remove`;
//! - **command** → ignored (administrative log entries);
//! - anything else → logged as unsupported, remaining watches skipped.

use crate::event::{OpKind, OplogEvent};
use crate::fields;
use crate::metrics::{self, DropReason};
use crate::reference::DocumentReference;
use crate::tracker::Tracker;
use crate::watch::Watch;
use bson::{Bson, Document};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Fans observed oplog entries out to concurrent handler invocations.
///
/// Holds no state between entries beyond the immutable watch list and the
/// tracker handle; the only externally visible effects are the
/// `tracker.handle_*` calls.
pub struct Dispatcher<T: Tracker> {
    watches: Arc<[Watch]>,
    tracker: Arc<T>,
    limit: Option<Arc<Semaphore>>,
}

impl<T: Tracker + 'static> Dispatcher<T> {
    /// Creates a dispatcher over an immutable watch list.
    ///
    /// `max_in_flight` bounds concurrently running dispatch tasks;
    /// `None` keeps the original unbounded fire-and-forget behavior.
    #[must_use]
    pub fn new(watches: Vec<Watch>, tracker: Arc<T>, max_in_flight: Option<usize>) -> Self {
        Self {
            watches: watches.into(),
            tracker,
            limit: max_in_flight.map(|permits| Arc::new(Semaphore::new(permits))),
        }
    }

    /// The configured watch list.
    #[must_use]
    pub fn watches(&self) -> &[Watch] {
        &self.watches
    }

    /// Submits one owned oplog entry for concurrent dispatch.
    ///
    /// Spawns a task and returns without waiting for handler work. When an
    /// in-flight bound is configured this awaits a permit first, which is the
    /// only way dispatch ever slows the read loop down.
    pub async fn dispatch(&self, entry: Document) {
        let permit = match &self.limit {
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        };

        let watches = Arc::clone(&self.watches);
        let tracker = Arc::clone(&self.tracker);

        metrics::dispatch_task_started();
        // fire-and-forget: the handle is never joined, not even on shutdown
        let _task = tokio::spawn(async move {
            let _permit = permit;
            apply_watches(&entry, &watches, tracker.as_ref()).await;
            metrics::dispatch_task_finished();
        });
    }
}

/// Runs the match-and-invoke pass for one entry against every watch.
///
/// This is the synchronous heart of dispatch, factored out of the spawned
/// task so it can be driven directly in tests. Per-event failures (malformed
/// entry, unsupported kind, handler errors) are logged and recovered here;
/// nothing escapes to the caller.
pub async fn apply_watches<T: Tracker + ?Sized>(raw: &Document, watches: &[Watch], tracker: &T) {
    let event = match OplogEvent::parse(raw) {
        Ok(event) => event,
        Err(error) => {
            warn!(%error, "dropping malformed oplog entry");
            metrics::increment_entries_dropped(DropReason::Malformed);
            return;
        }
    };

    let Some(document) = fields::document_field(raw, "o") else {
        debug!(namespace = %event.namespace, "oplog entry carries no operation document");
        metrics::increment_entries_dropped(DropReason::MissingDocument);
        return;
    };

    let namespace = event.namespace.full_name();

    for watch in watches {
        match &event.kind {
            OpKind::Insert => {
                if watch.matches_target(&namespace) {
                    let reference = DocumentReference::new(
                        event.namespace.database.clone(),
                        event.namespace.collection.clone(),
                        document.get("_id").cloned().unwrap_or(Bson::Null),
                    );
                    invoke_insert(tracker, watch, document, &reference).await;
                }
            }
            OpKind::Update => {
                if watch.matches_target(&namespace) {
                    // the updated document's identity lives in the selector,
                    // not in the modifier document
                    let id = fields::document_field(raw, "o2")
                        .and_then(|selector| selector.get("_id").cloned())
                        .unwrap_or(Bson::Null);
                    let reference = DocumentReference::new(
                        event.namespace.database.clone(),
                        event.namespace.collection.clone(),
                        id,
                    );
                    invoke_insert(tracker, watch, document, &reference).await;
                }

                if watch.matches_track(&namespace) {
                    if let Some(selector) = fields::document_field(raw, "o2") {
                        invoke_update(tracker, watch, document, selector).await;
                    }
                }
            }
            OpKind::Delete => {
                if watch.matches_track(&namespace) {
                    if let Some(selector) = fields::document_field(raw, "o2") {
                        invoke_remove(tracker, watch, document, selector).await;
                    }
                }
            }
            OpKind::Command => {
                // administrative log entries, nothing to track
            }
            OpKind::Unknown(code) => {
                warn!(op = %code, namespace = %namespace, "unsupported operation; skipping entry");
                metrics::increment_entries_dropped(DropReason::Unsupported);
                return;
            }
        }
    }
}

async fn invoke_insert<T: Tracker + ?Sized>(
    tracker: &T,
    watch: &Watch,
    document: &Document,
    reference: &DocumentReference,
) {
    metrics::increment_handler_invocations("insert");
    if let Err(error) = tracker.handle_insert(watch, document, reference).await {
        metrics::increment_handler_failures("insert");
        warn!(%error, target = %watch.target_collection, "insert handler failed");
    }
}

async fn invoke_update<T: Tracker + ?Sized>(
    tracker: &T,
    watch: &Watch,
    document: &Document,
    selector: &Document,
) {
    metrics::increment_handler_invocations("update");
    if let Err(error) = tracker.handle_update(watch, document, selector).await {
        metrics::increment_handler_failures("update");
        warn!(%error, track = %watch.track_collection, "update handler failed");
    }
}

async fn invoke_remove<T: Tracker + ?Sized>(
    tracker: &T,
    watch: &Watch,
    document: &Document,
    selector: &Document,
) {
    metrics::increment_handler_invocations("remove");
    if let Err(error) = tracker.handle_remove(watch, document, selector).await {
        metrics::increment_handler_failures("remove");
        warn!(%error, track = %watch.track_collection, "remove handler failed");
    }
}
