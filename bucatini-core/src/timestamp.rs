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

//! Conversion between wall-clock instants and oplog logical timestamps.
//!
//! The oplog orders entries by a 64-bit logical timestamp whose high 32 bits
//! are Unix seconds and whose low 32 bits are an ordinal counter within that
//! second. The counter is not reconstructible from wall-clock time alone, so
//! seeding a cursor from an instant means "first entry at or after this
//! second".

use bson::Timestamp;
use chrono::{DateTime, Utc};

/// The absolute origin of the log. Every live entry sorts after it.
pub const ORIGIN: Timestamp = Timestamp {
    time: 0,
    increment: 0,
};

/// Converts a wall-clock instant into the log's native logical timestamp.
///
/// The ordinal counter is zeroed; instants before the Unix epoch clamp to
/// [`ORIGIN`].
#[must_use]
pub fn log_timestamp(instant: DateTime<Utc>) -> Timestamp {
    Timestamp {
        time: instant.timestamp().clamp(0, i64::from(u32::MAX)) as u32,
        increment: 0,
    }
}

/// Converts a logical timestamp back to the wall-clock second it encodes.
///
/// The ordinal counter carries no wall-clock information and is discarded.
#[must_use]
pub fn wall_clock(ts: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(i64::from(ts.time), 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_timestamp_zeroes_the_ordinal() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 45).unwrap();
        let ts = log_timestamp(instant);
        assert_eq!(i64::from(ts.time), instant.timestamp());
        assert_eq!(ts.increment, 0);
    }

    #[test]
    fn wall_clock_inverts_whole_seconds() {
        let instant = Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(wall_clock(log_timestamp(instant)), instant);
    }

    #[test]
    fn pre_epoch_instants_clamp_to_origin() {
        let instant = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(log_timestamp(instant), ORIGIN);
    }

    #[test]
    fn origin_precedes_live_timestamps() {
        let live = log_timestamp(Utc::now());
        assert!(ORIGIN.time < live.time || (ORIGIN.time == live.time && ORIGIN.increment <= live.increment));
    }
}
