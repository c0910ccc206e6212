//! Fixed-format temporal adapters.
//!
//! Every temporal value the audit log writes uses one pattern: ISO-8601 in
//! UTC with millisecond precision and a literal `Z` suffix. The serde
//! `with`-modules make the pattern usable on payload struct fields in either
//! serializer tier; `parse_as` is the runtime-dispatch entry for callers
//! that name the target representation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// The one wire pattern: `2026-08-06T09:41:23.512Z`.
pub const ISO_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("`{0}` is not a valid ISO-8601 instant")]
    Parse(String),
    #[error("cannot deserialize a temporal value into `{0}`")]
    UnsupportedTarget(String),
}

/// Format an instant with the fixed pattern.
pub fn format_instant(value: &DateTime<Utc>) -> String {
    value.format(ISO_MILLIS).to_string()
}

/// Parse a value written by [`format_instant`].
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, TemporalError> {
    NaiveDateTime::parse_from_str(value, ISO_MILLIS)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| TemporalError::Parse(value.to_string()))
}

/// Deserialization targets the adapter knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalTarget {
    /// A UTC instant.
    Instant,
    /// A date-time without zone (SQL timestamp shape).
    Timestamp,
    /// A calendar date (SQL date shape).
    Date,
}

impl TemporalTarget {
    /// Resolve a target by name; anything the adapter cannot produce is an
    /// error, not a silent default.
    pub fn from_name(name: &str) -> Result<Self, TemporalError> {
        match name {
            "instant" | "datetime" => Ok(Self::Instant),
            "timestamp" => Ok(Self::Timestamp),
            "date" => Ok(Self::Date),
            other => Err(TemporalError::UnsupportedTarget(other.to_string())),
        }
    }
}

/// A parsed temporal value, tagged with its representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporalValue {
    Instant(DateTime<Utc>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

/// Parse `value` into the requested representation.
pub fn parse_as(value: &str, target: TemporalTarget) -> Result<TemporalValue, TemporalError> {
    let instant = parse_instant(value)?;
    Ok(match target {
        TemporalTarget::Instant => TemporalValue::Instant(instant),
        TemporalTarget::Timestamp => TemporalValue::Timestamp(instant.naive_utc()),
        TemporalTarget::Date => TemporalValue::Date(instant.date_naive()),
    })
}

/// Serde adapter for `DateTime<Utc>` fields: `#[serde(with = "temporal::iso_instant")]`.
pub mod iso_instant {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_instant(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_instant(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `NaiveDateTime` fields.
pub mod iso_timestamp {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(ISO_MILLIS).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_instant(&raw)
            .map(|instant| instant.naive_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `NaiveDate` fields; dates are written at midnight.
pub mod iso_date {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        let midnight = value.and_time(NaiveTime::MIN);
        serializer.serialize_str(&midnight.format(ISO_MILLIS).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_instant(&raw)
            .map(|instant| instant.date_naive())
            .map_err(serde::de::Error::custom)
    }
}
