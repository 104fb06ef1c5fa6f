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

//! Watch rules: which collections feed which trackers.
//!
//! A watch pairs a *target* collection (the source of truth whose inserts and
//! updates create or refresh a tracked copy) with a *track* collection (the
//! consumer of that copy, whose updates and deletes invalidate it). Watches
//! are declared in configuration, immutable at runtime, and shared read-only
//! by every concurrent dispatch task.
//!
//! The two sides of a watch are independent subscriptions: an update event on
//! a namespace that matches both fires both handler paths.
//!
//! # Examples
//!
//! ```rust
//! use bucatini_core::watch::Watch;
//!
//! let watch = Watch::new("shop.users", "shop.comments");
//! assert!(watch.matches_target("shop.users"));
//! assert!(watch.matches_track("shop.comments"));
//! assert!(!watch.matches_target("shop.comments"));
//! ```

use serde::{Deserialize, Serialize};

/// A single cross-collection propagation rule.
///
/// Both names are fully qualified `"database.collection"` strings, matched
/// verbatim against event namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Watch {
    /// Collection whose inserts/updates create or refresh tracked copies.
    #[serde(rename = "targetCollection")]
    pub target_collection: String,

    /// Collection whose updates/deletes invalidate previously tracked copies.
    #[serde(rename = "trackCollection")]
    pub track_collection: String,
}

impl Watch {
    /// Creates a watch from fully qualified collection names.
    pub fn new(target_collection: impl Into<String>, track_collection: impl Into<String>) -> Self {
        Self {
            target_collection: target_collection.into(),
            track_collection: track_collection.into(),
        }
    }

    /// Returns true if `namespace` names this watch's target collection.
    #[inline]
    #[must_use]
    pub fn matches_target(&self, namespace: &str) -> bool {
        self.target_collection == namespace
    }

    /// Returns true if `namespace` names this watch's track collection.
    #[inline]
    #[must_use]
    pub fn matches_track(&self, namespace: &str) -> bool {
        self.track_collection == namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_exact() {
        let watch = Watch::new("a.b", "a.c");
        assert!(watch.matches_target("a.b"));
        assert!(!watch.matches_target("a.b.c"));
        assert!(!watch.matches_track("a.b"));
        assert!(watch.matches_track("a.c"));
    }

    #[test]
    fn deserializes_from_config_shape() {
        let watch: Watch = serde_json::from_str(
            r#"{ "targetCollection": "shop.users", "trackCollection": "shop.comments" }"#,
        )
        .unwrap();
        assert_eq!(watch, Watch::new("shop.users", "shop.comments"));
    }

    #[test]
    fn serde_round_trip() {
        let watch = Watch::new("db.a", "db.b");
        let json = serde_json::to_string(&watch).unwrap();
        assert_eq!(serde_json::from_str::<Watch>(&json).unwrap(), watch);
    }
}
