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

//! In-memory recording tracker.
//!
//! Records every handler invocation so tests can assert on exactly what the
//! dispatcher delivered, in what order, per handler kind. Safe to share
//! across concurrent dispatch tasks.
//!
//! Nothing is persisted; records are lost when the tracker is dropped. For
//! anything beyond tests and prototyping, implement
//! [`Tracker`](bucatini_core::tracker::Tracker) against real storage.
//!
//! # Example
//!
//! ```rust
//! use bucatini_trackers::memory::MemoryTracker;
//! use bucatini_core::tracker::Tracker;
//! use bucatini_core::reference::DocumentReference;
//! use bucatini_core::watch::Watch;
//! use bson::{doc, Bson};
//!
//! # async fn example() -> Result<(), bucatini_core::tracker::TrackerError> {
//! let tracker = MemoryTracker::new();
//! let watch = Watch::new("shop.users", "shop.comments");
//! let reference = DocumentReference::new("shop", "users", Bson::Int32(1));
//!
//! tracker
//!     .handle_insert(&watch, &doc! { "_id": 1 }, &reference)
//!     .await?;
//!
//! let inserts = tracker.inserts().await;
//! assert_eq!(inserts[0].reference.id, Bson::Int32(1));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bson::Document;
use bucatini_core::reference::DocumentReference;
use bucatini_core::tracker::{Tracker, TrackerError};
use bucatini_core::watch::Watch;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

/// One recorded `handle_insert` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRecord {
    /// The watch that matched.
    pub watch: Watch,

    /// The inserted document (or, for target-collection updates, the
    /// update's modifier document).
    pub document: Document,

    /// Reference to the document the event was about.
    pub reference: DocumentReference,
}

/// One recorded `handle_update` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRecord {
    /// The watch that matched.
    pub watch: Watch,

    /// The update's replacement/modifier document.
    pub document: Document,

    /// Selector identifying the updated document.
    pub selector: Document,
}

/// One recorded `handle_remove` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveRecord {
    /// The watch that matched.
    pub watch: Watch,

    /// The delete's operation document.
    pub document: Document,

    /// Selector identifying the deleted document.
    pub selector: Document,
}

/// Tracker that records invocations in memory.
///
/// Cloning shares the underlying records, so a test can keep one handle and
/// give another to a dispatcher.
#[derive(Debug, Clone, Default)]
pub struct MemoryTracker {
    inserts: Arc<RwLock<Vec<InsertRecord>>>,
    updates: Arc<RwLock<Vec<UpdateRecord>>>,
    removes: Arc<RwLock<Vec<RemoveRecord>>>,
}

impl MemoryTracker {
    /// Creates an empty recording tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded insert invocations, in invocation order.
    pub async fn inserts(&self) -> Vec<InsertRecord> {
        self.inserts.read().await.clone()
    }

    /// Recorded update invocations, in invocation order.
    pub async fn updates(&self) -> Vec<UpdateRecord> {
        self.updates.read().await.clone()
    }

    /// Recorded remove invocations, in invocation order.
    pub async fn removes(&self) -> Vec<RemoveRecord> {
        self.removes.read().await.clone()
    }

    /// Total invocations recorded across all three handlers.
    pub async fn invocation_count(&self) -> usize {
        self.inserts.read().await.len()
            + self.updates.read().await.len()
            + self.removes.read().await.len()
    }

    /// Drops all recorded invocations.
    pub async fn clear(&self) {
        self.inserts.write().await.clear();
        self.updates.write().await.clear();
        self.removes.write().await.clear();
    }
}

#[async_trait]
impl Tracker for MemoryTracker {
    async fn handle_insert(
        &self,
        watch: &Watch,
        document: &Document,
        reference: &DocumentReference,
    ) -> Result<(), TrackerError> {
        trace!(target = %watch.target_collection, "recording insert");
        self.inserts.write().await.push(InsertRecord {
            watch: watch.clone(),
            document: document.clone(),
            reference: reference.clone(),
        });
        Ok(())
    }

    async fn handle_update(
        &self,
        watch: &Watch,
        document: &Document,
        selector: &Document,
    ) -> Result<(), TrackerError> {
        trace!(track = %watch.track_collection, "recording update");
        self.updates.write().await.push(UpdateRecord {
            watch: watch.clone(),
            document: document.clone(),
            selector: selector.clone(),
        });
        Ok(())
    }

    async fn handle_remove(
        &self,
        watch: &Watch,
        document: &Document,
        selector: &Document,
    ) -> Result<(), TrackerError> {
        trace!(track = %watch.track_collection, "recording remove");
        self.removes.write().await.push(RemoveRecord {
            watch: watch.clone(),
            document: document.clone(),
            selector: selector.clone(),
        });
        Ok(())
    }
}
