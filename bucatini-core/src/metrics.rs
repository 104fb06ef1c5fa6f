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

//! Metrics instrumentation for the tailer.
//!
//! Uses the `metrics` facade crate, so any exporter (Prometheus, StatsD, ...)
//! installed by the embedding application picks these up; with no recorder
//! installed every call is a no-op.
//!
//! Naming follows Prometheus conventions: underscores, a `bucatini_` prefix,
//! counters ending in `_total`. Labels stay low-cardinality — handler kind
//! and drop reason only, never namespaces of unbounded variety or document
//! ids.
//!
//! # Examples
//!
//! ```rust
//! use bucatini_core::metrics::{self, DropReason};
//!
//! metrics::init_metrics();
//! metrics::increment_entries_observed();
//! metrics::increment_entries_dropped(DropReason::Malformed);
//! metrics::increment_handler_invocations("insert");
//! ```

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Total oplog entries observed by the read loop.
const ENTRIES_OBSERVED_TOTAL: &str = "bucatini_entries_observed_total";

/// Total entries dropped without reaching any handler.
///
/// Labels: reason
const ENTRIES_DROPPED_TOTAL: &str = "bucatini_entries_dropped_total";

/// Total tracker handler invocations.
///
/// Labels: handler
const HANDLER_INVOCATIONS_TOTAL: &str = "bucatini_handler_invocations_total";

/// Total tracker handler invocations that returned an error.
///
/// Labels: handler
const HANDLER_FAILURES_TOTAL: &str = "bucatini_handler_failures_total";

/// Total cursor reopens after clean exhaustion.
const REQUERIES_TOTAL: &str = "bucatini_requeries_total";

/// Dispatch tasks currently in flight.
const DISPATCH_IN_FLIGHT: &str = "bucatini_dispatch_in_flight";

/// Why an entry was dropped before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The entry's namespace could not be parsed.
    Malformed,

    /// The entry's operation kind is outside the known set.
    Unsupported,

    /// The entry has no operation document to hand to a handler.
    MissingDocument,
}

impl DropReason {
    /// Label value for this reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Unsupported => "unsupported",
            Self::MissingDocument => "missing_document",
        }
    }
}

/// Registers metric descriptions with the installed recorder.
///
/// Call once at application startup, before the tailer runs. Purely
/// descriptive; recording works without it.
pub fn init_metrics() {
    describe_counter!(
        ENTRIES_OBSERVED_TOTAL,
        "Total oplog entries observed by the read loop"
    );
    describe_counter!(
        ENTRIES_DROPPED_TOTAL,
        "Total entries dropped before reaching any tracker handler"
    );
    describe_counter!(
        HANDLER_INVOCATIONS_TOTAL,
        "Total tracker handler invocations"
    );
    describe_counter!(
        HANDLER_FAILURES_TOTAL,
        "Total tracker handler invocations that returned an error"
    );
    describe_counter!(
        REQUERIES_TOTAL,
        "Total oplog cursor reopens after clean exhaustion"
    );
    describe_gauge!(DISPATCH_IN_FLIGHT, "Dispatch tasks currently in flight");
}

/// Counts one entry observed by the read loop.
pub fn increment_entries_observed() {
    counter!(ENTRIES_OBSERVED_TOTAL).increment(1);
}

/// Counts one entry dropped before dispatch.
pub fn increment_entries_dropped(reason: DropReason) {
    counter!(ENTRIES_DROPPED_TOTAL, "reason" => reason.as_str()).increment(1);
}

/// Counts one handler invocation. `handler` is "insert", "update", or "remove".
pub fn increment_handler_invocations(handler: &'static str) {
    counter!(HANDLER_INVOCATIONS_TOTAL, "handler" => handler).increment(1);
}

/// Counts one failed handler invocation.
pub fn increment_handler_failures(handler: &'static str) {
    counter!(HANDLER_FAILURES_TOTAL, "handler" => handler).increment(1);
}

/// Counts one cursor reopen after clean exhaustion.
pub fn increment_requeries() {
    counter!(REQUERIES_TOTAL).increment(1);
}

/// Marks one dispatch task as started.
pub fn dispatch_task_started() {
    gauge!(DISPATCH_IN_FLIGHT).increment(1.0);
}

/// Marks one dispatch task as finished.
pub fn dispatch_task_finished() {
    gauge!(DISPATCH_IN_FLIGHT).decrement(1.0);
}
