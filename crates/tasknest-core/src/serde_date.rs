//! `YYYY-MM-DD` serde helpers for calendar dates.
//!
//! Deserialization also accepts a full ISO-8601 timestamp and keeps its date part,
//! which is what older exports contain.

use serde::{Deserialize, Deserializer, Serializer};
use time::Date;
use time::macros::format_description;

/// Format a date as `YYYY-MM-DD`.
///
/// # Errors
/// Returns an error if the date cannot be formatted.
pub fn format(date: Date) -> Result<String, time::error::Format> {
    date.format(format_description!("[year]-[month]-[day]"))
}

/// Parse the leading `YYYY-MM-DD` of an ISO-8601 string.
///
/// # Errors
/// Returns an error when the input does not start with a valid calendar date.
pub fn parse(raw: &str) -> Result<Date, time::error::Parse> {
    let trimmed = raw.trim();
    let day_part = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse(day_part, format_description!("[year]-[month]-[day]"))
}

/// Serialize a date.
///
/// # Errors
/// Propagates formatting failures as serializer errors.
pub fn serialize<S>(date: &Date, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text = format(*date).map_err(serde::ser::Error::custom)?;
    s.serialize_str(&text)
}

/// Deserialize a date.
///
/// # Errors
/// Fails when the string is not an ISO-8601 date.
pub fn deserialize<'de, D>(d: D) -> Result<Date, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// Helpers for `Option<Date>` fields; `null` maps to `None`.
pub mod option {
    use super::{Date, Deserialize, Deserializer, Serializer};

    /// Serialize an optional date.
    ///
    /// # Errors
    /// Propagates formatting failures as serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => super::serialize(date, s),
            None => s.serialize_none(),
        }
    }

    /// Deserialize an optional date. Empty strings are treated as absent.
    ///
    /// # Errors
    /// Fails when a present value is not an ISO-8601 date.
    pub fn deserialize<'de, D>(d: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => super::parse(text).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_plain_and_timestamp_forms() {
        assert_eq!(parse("2024-06-01").ok(), Some(date!(2024 - 06 - 01)));
        assert_eq!(parse("2024-06-01T12:00:00.000Z").ok(), Some(date!(2024 - 06 - 01)));
        assert!(parse("06/01/2024").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format(date!(2024 - 01 - 05)).ok().as_deref(), Some("2024-01-05"));
    }
}
