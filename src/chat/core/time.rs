//! Timestamp helpers.
//!
//! Timestamps are kept at millisecond precision so the persisted ISO-8601 form
//! (`2026-10-19T08:30:00.123Z`) round-trips to an equal value.

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC time truncated to milliseconds.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Serde module for ISO-8601 timestamps with millisecond precision.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    ///
    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Deserialize any RFC 3339 timestamp into UTC.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid RFC 3339 timestamp.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
