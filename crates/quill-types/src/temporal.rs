//! Timestamp keys and duration encoding.
//!
//! Time-ordered indexes store RFC 3339 strings with a fixed-width nanosecond
//! fraction, so byte order equals chronological order for years 0000-9999.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::TypeError;

/// Length of every key produced by [`time_key`].
pub const TIME_KEY_LEN: usize = "2006-01-02T15:04:05.000000000Z".len();

/// A block without a TTL lasts this many years.
pub const PERMANENT_BLOCK_YEARS: i64 = 100;

/// Render `ts` as a fixed-width, lexicographically sortable key.
pub fn time_key(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a key produced by [`time_key`] (or any RFC 3339 string).
pub fn parse_time_key(key: &str) -> Result<DateTime<Utc>, TypeError> {
    DateTime::parse_from_rfc3339(key)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| TypeError::InvalidTimeKey(key.to_string()))
}

/// Expiration used for blocks without a TTL.
pub fn permanent_until(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(365 * PERMANENT_BLOCK_YEARS)
}

/// Serde adapter for `Option<std::time::Duration>` as integer nanoseconds.
///
/// Zero and absent both decode to `None`.
pub mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let nanos = Option::<u64>::deserialize(d)?;
        Ok(nanos.filter(|n| *n > 0).map(Duration::from_nanos))
    }
}
