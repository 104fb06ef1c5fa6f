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

//! The tail loop: cursor lifecycle, resumption, and cancellation.
//!
//! [`Tailer::run`] owns a tailable-await cursor over the replication oplog
//! and drives an explicit state machine:
//!
//! ```text
//! Connecting ──► Streaming ──► Requerying ──► Streaming ──► ...
//!                    │
//!                    └──► Stopped (cancellation, or fatal cursor error)
//! ```
//!
//! - **Connecting / Requerying**: open a cursor over entries with timestamp
//!   strictly greater than the resume position, in natural order, with
//!   server-side await up to the idle timeout.
//! - **Streaming**: each yielded entry advances the in-memory resume
//!   position to its timestamp before being handed to the dispatcher. An
//!   elapsed idle window is not an error — the loop re-polls the same
//!   cursor. Clean exhaustion (the server closed the streaming window)
//!   moves to Requerying, which reopens from the last observed timestamp,
//!   so normal continuation neither regresses nor replays.
//! - **Stopped**: terminal. Reached on a cancellation signal (clean return)
//!   or any cursor error (surfaced to the caller; retry policy belongs
//!   there, not here). Entries already submitted for dispatch are not
//!   awaited or canceled.
//!
//! Delivery is at-least-once: a full rescan (or a restart whose start time
//! predates already-processed entries) redelivers retained history, which
//! trackers are expected to absorb idempotently.
//!
//! # Example
//!
//! ```rust,no_run
//! use bucatini_core::tailer::{Tailer, TailerConfig};
//! use bucatini_core::watch::Watch;
//! use std::sync::Arc;
//! use tokio::sync::broadcast;
//! # use bucatini_core::reference::DocumentReference;
//! # use bucatini_core::tracker::{Tracker, TrackerError};
//! # use async_trait::async_trait;
//! # use bson::Document;
//! # struct MyTracker;
//! # #[async_trait]
//! # impl Tracker for MyTracker {
//! #     async fn handle_insert(&self, _: &Watch, _: &Document, _: &DocumentReference) -> Result<(), TrackerError> { Ok(()) }
//! #     async fn handle_update(&self, _: &Watch, _: &Document, _: &Document) -> Result<(), TrackerError> { Ok(()) }
//! #     async fn handle_remove(&self, _: &Watch, _: &Document, _: &Document) -> Result<(), TrackerError> { Ok(()) }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TailerConfig::builder()
//!     .mongodb_uri("mongodb://localhost:27017/?replicaSet=rs0")
//!     .watch(Watch::new("shop.users", "shop.comments"))
//!     .build()?;
//!
//! let tailer = Tailer::connect(config, Arc::new(MyTracker)).await?;
//!
//! let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     shutdown_tx.send(()).ok();
//! });
//!
//! tailer.run(shutdown_rx, false).await?;
//! # Ok(())
//! # }
//! ```

use crate::dispatch::Dispatcher;
use crate::event::Namespace;
use crate::fields;
use crate::metrics;
use crate::timestamp;
use crate::tracker::Tracker;
use crate::watch::Watch;
use bson::{doc, Document, Timestamp};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::CursorType;
use mongodb::{Client, Collection, Cursor};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, trace, warn};

/// Server-side await window and client-side idle poll period.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors that stop the tailer or prevent it from starting.
///
/// Per-event problems (malformed entries, unsupported operations, handler
/// failures) never surface here; they are logged and recovered inside the
/// dispatch path.
#[derive(Debug, Error)]
pub enum TailError {
    /// The initial session could not be established. The tailer never starts.
    #[error("failed to establish MongoDB session: {0}")]
    Connection(#[source] mongodb::error::Error),

    /// The oplog cursor failed while streaming. Fatal for this tailer
    /// instance; restart policy is the caller's responsibility.
    #[error("oplog cursor failed: {0}")]
    Cursor(#[source] mongodb::error::Error),

    /// Invalid configuration, rejected at build time.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// States of the tail loop.
///
/// Kept as an explicit value (not inferred from control flow) so the
/// cancellation-polling and error-escalation points stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// Opening the initial cursor.
    Connecting,

    /// Draining the current cursor.
    Streaming,

    /// The cursor was exhausted cleanly; reopening from the resume position.
    Requerying,

    /// Terminal: cancellation or a fatal cursor error.
    Stopped,
}

/// Configuration for a [`Tailer`].
///
/// Built via [`TailerConfig::builder`]:
///
/// ```rust
/// use bucatini_core::tailer::TailerConfig;
/// use bucatini_core::watch::Watch;
///
/// let config = TailerConfig::builder()
///     .mongodb_uri("mongodb://localhost:27017")
///     .watch(Watch::new("shop.users", "shop.comments"))
///     .max_in_flight(256)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// MongoDB connection URI. The deployment must expose an oplog, i.e. run
    /// as a replica set.
    pub mongodb_uri: String,

    /// Watch rules, immutable for the tailer's lifetime.
    pub watches: Vec<Watch>,

    /// Wall-clock instant the resume position is seeded from on a normal
    /// (non-rescan) run.
    pub start_time: DateTime<Utc>,

    /// How long the cursor waits server-side for new entries before the loop
    /// re-polls. Default 1 second.
    pub idle_timeout: Duration,

    /// Bound on concurrently running dispatch tasks. `None` (the default)
    /// spawns without limit.
    pub max_in_flight: Option<usize>,

    /// Namespace of the oplog collection. Default `local.oplog.rs`;
    /// overridable for tests that tail a hand-built capped collection.
    pub oplog_namespace: Namespace,
}

impl TailerConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> TailerConfigBuilder {
        TailerConfigBuilder::default()
    }
}

/// Builder for [`TailerConfig`].
#[derive(Debug, Default)]
pub struct TailerConfigBuilder {
    mongodb_uri: Option<String>,
    watches: Vec<Watch>,
    start_time: Option<DateTime<Utc>>,
    idle_timeout: Option<Duration>,
    max_in_flight: Option<usize>,
    oplog_namespace: Option<Namespace>,
}

impl TailerConfigBuilder {
    /// Sets the MongoDB connection URI. Required.
    #[must_use]
    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    /// Adds one watch rule. At least one is required.
    #[must_use]
    pub fn watch(mut self, watch: Watch) -> Self {
        self.watches.push(watch);
        self
    }

    /// Replaces the watch list.
    #[must_use]
    pub fn watches(mut self, watches: Vec<Watch>) -> Self {
        self.watches = watches;
        self
    }

    /// Sets the wall-clock instant to resume from. Default: now, stamped at
    /// build time.
    #[must_use]
    pub fn start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Sets the cursor idle timeout. Default 1 second; must be non-zero.
    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    /// Caps concurrently running dispatch tasks. Default: unbounded.
    #[must_use]
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight);
        self
    }

    /// Overrides the oplog namespace. Default `local.oplog.rs`.
    #[must_use]
    pub fn oplog_namespace(mut self, database: impl Into<String>, collection: impl Into<String>) -> Self {
        self.oplog_namespace = Some(Namespace::new(database, collection));
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::Configuration`] when the URI is missing, the
    /// watch list is empty, the idle timeout is zero, or `max_in_flight`
    /// is zero.
    pub fn build(self) -> Result<TailerConfig, TailError> {
        let mongodb_uri = self
            .mongodb_uri
            .ok_or_else(|| TailError::Configuration("mongodb_uri is required".to_string()))?;

        if self.watches.is_empty() {
            return Err(TailError::Configuration(
                "at least one watch is required".to_string(),
            ));
        }

        let idle_timeout = self.idle_timeout.unwrap_or(DEFAULT_IDLE_TIMEOUT);
        if idle_timeout.is_zero() {
            return Err(TailError::Configuration(
                "idle_timeout must be greater than zero".to_string(),
            ));
        }

        if self.max_in_flight == Some(0) {
            return Err(TailError::Configuration(
                "max_in_flight must be greater than zero".to_string(),
            ));
        }

        Ok(TailerConfig {
            mongodb_uri,
            watches: self.watches,
            start_time: self.start_time.unwrap_or_else(Utc::now),
            idle_timeout,
            max_in_flight: self.max_in_flight,
            oplog_namespace: self
                .oplog_namespace
                .unwrap_or_else(|| Namespace::new("local", "oplog.rs")),
        })
    }
}

/// The oplog tailer: reads the log sequentially, dispatches concurrently.
///
/// One `Tailer` owns one sequential read loop. Handler work runs on spawned
/// tasks through the tracker's own connection handle, so it never contends
/// with the loop's cursor reads.
pub struct Tailer<T: Tracker> {
    config: TailerConfig,
    client: Client,
    dispatcher: Dispatcher<T>,
}

impl<T: Tracker + 'static> Tailer<T> {
    /// Establishes the MongoDB session and verifies the deployment responds.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::Connection`] when the session cannot be
    /// established; the tailer never starts.
    pub async fn connect(config: TailerConfig, tracker: Arc<T>) -> Result<Self, TailError> {
        info!(watches = config.watches.len(), "connecting to MongoDB");

        let client = Client::with_uri_str(&config.mongodb_uri)
            .await
            .map_err(TailError::Connection)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(TailError::Connection)?;

        info!("connected");

        let dispatcher = Dispatcher::new(
            config.watches.clone(),
            tracker,
            config.max_in_flight,
        );

        Ok(Self {
            config,
            client,
            dispatcher,
        })
    }

    /// The tailer's configuration.
    #[must_use]
    pub fn config(&self) -> &TailerConfig {
        &self.config
    }

    /// Tails the oplog until cancelled or a fatal cursor error.
    ///
    /// `shutdown` is polled at the top of every loop iteration; any receipt
    /// (a value, a closed channel, or a lagged receiver) requests shutdown
    /// and yields a clean `Ok(())`. In-flight dispatch tasks are neither
    /// awaited nor canceled.
    ///
    /// With `rescan` the resume position is forced to the log's absolute
    /// origin instead of the configured start time, redelivering all
    /// retained history.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::Cursor`] when the log source reports a streaming
    /// error. No automatic retry happens at this layer.
    #[instrument(skip(self, shutdown), fields(oplog = %self.config.oplog_namespace))]
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<()>,
        rescan: bool,
    ) -> Result<(), TailError> {
        let oplog: Collection<Document> = self
            .client
            .database(&self.config.oplog_namespace.database)
            .collection(&self.config.oplog_namespace.collection);

        let mut resume = if rescan {
            info!("rescan requested; replaying from the log origin");
            timestamp::ORIGIN
        } else {
            timestamp::log_timestamp(self.config.start_time)
        };

        let mut state = TailState::Connecting;
        let mut cursor: Option<Cursor<Document>> = None;
        let mut outcome = Ok(());

        loop {
            match state {
                TailState::Connecting => match self.open_cursor(&oplog, resume).await {
                    Ok(opened) => {
                        cursor = Some(opened);
                        state = TailState::Streaming;
                    }
                    Err(err) => {
                        outcome = Err(err);
                        state = TailState::Stopped;
                    }
                },

                TailState::Requerying => {
                    debug!(time = resume.time, increment = resume.increment, "requerying");
                    metrics::increment_requeries();
                    match self.open_cursor(&oplog, resume).await {
                        Ok(opened) => {
                            cursor = Some(opened);
                            state = TailState::Streaming;
                        }
                        Err(err) => {
                            outcome = Err(err);
                            state = TailState::Stopped;
                        }
                    }
                }

                TailState::Streaming => {
                    let Some(active) = cursor.as_mut() else {
                        state = TailState::Connecting;
                        continue;
                    };

                    tokio::select! {
                        biased;

                        _ = shutdown.recv() => {
                            info!("shutdown signal received; stopping tailer");
                            state = TailState::Stopped;
                        }

                        polled = timeout(self.config.idle_timeout, active.try_next()) => match polled {
                            // idle window elapsed with no entries and no
                            // error: re-poll the same cursor
                            Err(_) => trace!("idle timeout; re-polling"),

                            Ok(Ok(Some(entry))) => {
                                match fields::timestamp_field(&entry, "ts") {
                                    Some(ts) => resume = ts,
                                    None => warn!("oplog entry without ts; resume position unchanged"),
                                }
                                metrics::increment_entries_observed();
                                self.dispatcher.dispatch(entry).await;
                            }

                            Ok(Ok(None)) => {
                                debug!("cursor exhausted cleanly");
                                state = TailState::Requerying;
                            }

                            Ok(Err(err)) => {
                                error!(error = %err, "oplog cursor failed");
                                outcome = Err(TailError::Cursor(err));
                                state = TailState::Stopped;
                            }
                        }
                    }
                }

                TailState::Stopped => {
                    drop(cursor.take());
                    info!("tailer stopped");
                    return outcome;
                }
            }
        }
    }

    /// Opens a tailable-await cursor over entries newer than `resume`.
    async fn open_cursor(
        &self,
        oplog: &Collection<Document>,
        resume: Timestamp,
    ) -> Result<Cursor<Document>, TailError> {
        trace!(time = resume.time, increment = resume.increment, "opening oplog cursor");

        oplog
            .find(doc! { "ts": { "$gt": resume } })
            .sort(doc! { "$natural": 1 })
            .cursor_type(CursorType::TailableAwait)
            .max_await_time(self.config.idle_timeout)
            .await
            .map_err(TailError::Cursor)
    }
}
