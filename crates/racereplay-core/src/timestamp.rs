//! Wire timestamps
//!
//! The API sends timestamps as ISO-8601 strings. The exact string has to be
//! echoed back when requesting chunk ranges, so a [`Timestamp`] keeps both
//! the raw text and the parsed instant.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Naive formats tried when the string carries no UTC offset
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A timestamp as received from the telemetry API
///
/// Equality, ordering and hashing use the parsed instant only, so
/// `2025-04-04T18:47:21Z` and `2025-04-04T18:47:21.000+00:00` compare equal.
#[derive(Debug, Clone)]
pub struct Timestamp {
    raw: String,
    millis: i64,
}

impl Timestamp {
    /// Parse a wire timestamp
    ///
    /// Accepts RFC 3339 (with `Z` or an offset), ISO-8601 without an offset
    /// (interpreted as UTC) or a plain integer of epoch milliseconds.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let millis = if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            dt.timestamp_millis()
        } else if let Some(naive) = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        {
            naive.and_utc().timestamp_millis()
        } else {
            trimmed.parse::<i64>().ok()?
        };

        Some(Self {
            raw: trimmed.to_string(),
            millis,
        })
    }

    /// Build a timestamp from epoch milliseconds, rendered as RFC 3339
    pub fn from_millis(millis: i64) -> Self {
        let raw = DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| millis.to_string());
        Self { raw, millis }
    }

    /// The exact string received over the wire
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Milliseconds since the Unix epoch
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// The instant as a UTC date-time, if representable
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.millis)
    }

    /// Absolute distance between two timestamps
    pub fn distance(&self, other: &Timestamp) -> Duration {
        Duration::from_millis(self.millis.abs_diff(other.millis))
    }

    /// Signed offset in milliseconds from `self` to `other`
    pub fn millis_until(&self, other: &Timestamp) -> i64 {
        other.millis - self.millis
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.millis == other.millis
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.millis.cmp(&other.millis)
    }
}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.millis.hash(state);
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an ISO-8601 timestamp string or epoch milliseconds")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Timestamp, E> {
        Timestamp::parse(value)
            .ok_or_else(|| E::custom(format!("unrecognized timestamp '{value}'")))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Timestamp, E> {
        Ok(Timestamp {
            raw: value.to_string(),
            millis: value,
        })
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Timestamp, E> {
        let millis = i64::try_from(value).map_err(|_| E::custom("timestamp out of range"))?;
        self.visit_i64(millis)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}
