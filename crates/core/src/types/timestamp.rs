//! Lenient timestamp decoding for backend payloads.
//!
//! The backend emits RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.f]`
//! timestamps without an offset, and bare dates. Naive values are UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Parse a backend timestamp in any of the accepted shapes.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` helper for optional timestamps.
///
/// `null`, a missing field and an unparseable string all decode to `None`;
/// a malformed date on a news item should not make the whole list unreadable.
///
/// # Errors
///
/// Returns an error only if the value is neither a string nor `null`.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// `deserialize_with` helper for optional deadlines.
///
/// `null` and a missing field decode to `None`, like
/// [`deserialize_optional`], but a string that does not parse is an error.
///
/// # Errors
///
/// Returns an error if the value is not `null` or a parseable timestamp.
pub fn deserialize_deadline<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|raw| {
        parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("unrecognized timestamp {raw:?}")))
    })
    .transpose()
}
