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

//! Tracker implementations for the Bucatini oplog tailer.
//!
//! This crate provides ready-made implementations of the
//! [`Tracker`](bucatini_core::tracker::Tracker) trait:
//!
//! - **Memory**: records every handler invocation in memory — the workhorse
//!   for tests and prototyping
//! - **Logging**: emits a structured log line per invocation — useful for
//!   smoke-testing a watch configuration against live traffic
//!
//! Production trackers that persist mirrored documents belong to the
//! embedding application; they own their database handle and implement the
//! same trait.
//!
//! # Example
//!
//! ```rust
//! use bucatini_trackers::memory::MemoryTracker;
//! use bucatini_core::dispatch::apply_watches;
//! use bucatini_core::watch::Watch;
//! use bson::doc;
//!
//! # async fn example() {
//! let tracker = MemoryTracker::new();
//! let watches = vec![Watch::new("shop.users", "shop.comments")];
//!
//! let entry = doc! {
//!     "ns": "shop.users",
//!     "op": "i",
//!     "o": { "_id": 1, "name": "Alice" },
//! };
//!
//! apply_watches(&entry, &watches, &tracker).await;
//! assert_eq!(tracker.inserts().await.len(), 1);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod logging;
pub mod memory;
