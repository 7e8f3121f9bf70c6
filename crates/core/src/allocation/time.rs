//! Platform date values as they appear in stored order documents.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::AllocationError;

/// A date or instant in any of the shapes the document store has produced.
///
/// Decoded once at the boundary and normalized to an ISO-8601 string or a
/// calendar date; nothing downstream branches on the original shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// RFC 3339 / ISO-8601 text, or a plain `YYYY-MM-DD` date.
    Text(String),
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// Document-store timestamp object.
    Seconds {
        /// Whole seconds since the Unix epoch.
        #[serde(alias = "_seconds")]
        seconds: i64,
        /// Sub-second part.
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    /// Anything else. Never resolves to an instant.
    Other(Value),
}

impl RawTimestamp {
    /// Resolves the value to an instant, or `None` if it is not a valid date.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(text) => parse_text(text),
            Self::EpochMillis(millis) => DateTime::from_timestamp_millis(*millis),
            Self::Seconds {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(*seconds, *nanoseconds),
            Self::Other(_) => None,
        }
    }

    /// Resolves the value to a calendar date (UTC).
    #[must_use]
    pub fn to_date(&self) -> Option<NaiveDate> {
        self.to_datetime().map(|instant| instant.date_naive())
    }

    /// Like [`Self::to_date`], but reports what could not be parsed.
    pub fn require_date(&self) -> Result<NaiveDate, AllocationError> {
        self.to_date()
            .ok_or_else(|| AllocationError::InvalidDate(self.describe()))
    }

    fn describe(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::EpochMillis(millis) => millis.to_string(),
            Self::Seconds { seconds, .. } => format!("{seconds}s"),
            Self::Other(value) => value.to_string(),
        }
    }
}

impl From<&str> for RawTimestamp {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Formats an instant as `YYYY-MM-DDTHH:MM:SS.sssZ`.
#[must_use]
pub fn to_iso_string(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Normalizes a stored `appliedAt` value, falling back to `now`.
#[must_use]
pub fn normalize_applied_at(raw: Option<&RawTimestamp>, now: DateTime<Utc>) -> String {
    to_iso_string(raw.and_then(RawTimestamp::to_datetime).unwrap_or(now))
}
