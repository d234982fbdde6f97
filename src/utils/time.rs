use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// ISO 8601 without an offset, as emitted by Python's `datetime.isoformat()`.
const NAIVE_ISO8601: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");

/// Parse an ISO 8601 timestamp.
///
/// RFC 3339 values keep their offset.  Values without an offset are taken
/// as UTC.
pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let s = s.trim();
    match OffsetDateTime::parse(s, &Rfc3339) {
        Ok(datetime) => Ok(datetime),
        Err(_) => PrimitiveDateTime::parse(s, NAIVE_ISO8601).map(PrimitiveDateTime::assume_utc),
    }
}

/// Format a timestamp as RFC 3339, falling back to the debug form.
pub fn format_timestamp(datetime: &OffsetDateTime) -> String {
    datetime
        .format(&Rfc3339)
        .unwrap_or_else(|_| format!("{datetime:?}"))
}

/// Deserialize an ISO 8601 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}
