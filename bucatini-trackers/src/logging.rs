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

//! Tracker that logs every invocation and persists nothing.
//!
//! Point a tailer at this to see which watches fire against live traffic
//! before wiring up real persistence. Identities are logged at `info`; full
//! documents only at `trace`, since operation documents can be large.

use async_trait::async_trait;
use bson::Document;
use bucatini_core::reference::DocumentReference;
use bucatini_core::tracker::{Tracker, TrackerError};
use bucatini_core::watch::Watch;
use tracing::{info, trace};

/// Tracker whose only side effect is structured log output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTracker;

impl LoggingTracker {
    /// Creates a logging tracker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tracker for LoggingTracker {
    async fn handle_insert(
        &self,
        watch: &Watch,
        document: &Document,
        reference: &DocumentReference,
    ) -> Result<(), TrackerError> {
        info!(
            target = %watch.target_collection,
            collection = %reference.collection,
            id = %reference.id,
            "insert"
        );
        trace!(?document, "insert document");
        Ok(())
    }

    async fn handle_update(
        &self,
        watch: &Watch,
        document: &Document,
        selector: &Document,
    ) -> Result<(), TrackerError> {
        info!(track = %watch.track_collection, ?selector, "update");
        trace!(?document, "update document");
        Ok(())
    }

    async fn handle_remove(
        &self,
        watch: &Watch,
        document: &Document,
        selector: &Document,
    ) -> Result<(), TrackerError> {
        info!(track = %watch.track_collection, ?selector, "remove");
        trace!(?document, "remove document");
        Ok(())
    }
}
