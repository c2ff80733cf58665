//! Calendar-date validation, parsing, and day arithmetic.
//!
//! Task dates travel as `YYYY-MM-DD` strings. Parsing is strict: the shape must
//! match exactly and the month/day components must name a real calendar date.
//! Overflowing components such as `2024-02-30` are rejected instead of being
//! rolled into the following month.

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

const SECONDS_PER_DAY: i128 = 86_400;
const NANOS_PER_DAY: i128 = SECONDS_PER_DAY * 1_000_000_000;

/// Reasons a calendar-date string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// Input was empty or whitespace.
    #[error("date is empty")]
    Empty,
    /// Input did not have the `YYYY-MM-DD` shape.
    #[error("date '{0}' must use the YYYY-MM-DD format")]
    Format(String),
    /// Input had the right shape but does not exist on the calendar.
    #[error("date '{0}' is not a real calendar date")]
    OutOfRange(String),
}

/// Parse a strict `YYYY-MM-DD` string into a [`Date`].
///
/// # Errors
/// Returns [`DateError`] when the input is empty, malformed, or names a
/// non-existent day.
pub fn parse_date(raw: &str) -> Result<Date, DateError> {
    if raw.is_empty() {
        return Err(DateError::Empty);
    }
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(idx, b)| idx == 4 || idx == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(DateError::Format(raw.to_owned()));
    }

    let component = |range: std::ops::Range<usize>| -> Result<u16, DateError> {
        raw[range]
            .parse::<u16>()
            .map_err(|_| DateError::Format(raw.to_owned()))
    };
    let year = i32::from(component(0..4)?);
    let month = u8::try_from(component(5..7)?).map_err(|_| DateError::OutOfRange(raw.to_owned()))?;
    let day = u8::try_from(component(8..10)?).map_err(|_| DateError::OutOfRange(raw.to_owned()))?;

    let month = Month::try_from(month).map_err(|_| DateError::OutOfRange(raw.to_owned()))?;
    Date::from_calendar_date(year, month, day).map_err(|_| DateError::OutOfRange(raw.to_owned()))
}

/// Returns true iff `raw` is a valid calendar date in `YYYY-MM-DD` form.
#[must_use]
pub fn is_valid_date(raw: &str) -> bool {
    parse_date(raw).is_ok()
}

/// Signed number of days from `reference` to `date`.
///
/// Positive when `date` lies in the future relative to `reference`.
#[must_use]
pub fn days_between(date: Date, reference: Date) -> i64 {
    (date - reference).whole_days()
}

/// Signed day count between two instants, rounding partial days up.
///
/// A difference of a few hours into the future counts as one full day, while a
/// few hours into the past rounds towards zero.
#[must_use]
pub fn days_between_instants(instant: OffsetDateTime, reference: OffsetDateTime) -> i64 {
    ceil_days(instant - reference)
}

fn ceil_days(diff: Duration) -> i64 {
    let nanos = diff.whole_nanoseconds();
    let mut days = nanos / NANOS_PER_DAY;
    if nanos % NANOS_PER_DAY > 0 {
        days += 1;
    }
    i64::try_from(days).unwrap_or(if days.is_negative() { i64::MIN } else { i64::MAX })
}

/// Current calendar date in UTC.
#[must_use]
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Render a date in its canonical `YYYY-MM-DD` form.
#[must_use]
pub fn format_iso(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Render a date for people, e.g. `01 Jan 2025`.
#[must_use]
pub fn format_display(date: Date) -> String {
    date.format(format_description!("[day] [month repr:short] [year]"))
        .unwrap_or_else(|_| format_iso(date))
}

/// Render an instant for people, e.g. `01 Jan 2025 14:05`.
#[must_use]
pub fn format_display_instant(instant: OffsetDateTime) -> String {
    instant
        .format(format_description!(
            "[day] [month repr:short] [year] [hour]:[minute]"
        ))
        .unwrap_or_else(|_| format_timestamp(instant))
}

/// Parse an RFC 3339 timestamp and normalize it to UTC.
///
/// # Errors
/// Returns the underlying parse error for malformed input.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).map(|ts| ts.to_offset(UtcOffset::UTC))
}

/// Render an instant as RFC 3339.
#[must_use]
pub fn format_timestamp(instant: OffsetDateTime) -> String {
    instant
        .format(&Rfc3339)
        .unwrap_or_else(|_| instant.unix_timestamp().to_string())
}

/// Serde adapter for strict `YYYY-MM-DD` date fields.
pub mod iso {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    /// Serialize a date as `YYYY-MM-DD`.
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn serialize<S>(date: &Date, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&super::format_iso(*date))
    }

    /// Deserialize a strict `YYYY-MM-DD` string.
    ///
    /// # Errors
    /// Fails when the string is not a real calendar date.
    pub fn deserialize<'de, D>(d: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(d)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional RFC 3339 timestamps.
///
/// Missing, null, and unparsable values all read back as `None`; a record with
/// a garbled timestamp is treated like a legacy record without one.
pub mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    /// Serialize an optional instant as RFC 3339 (or null).
    ///
    /// # Errors
    /// Propagates serializer failures.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<OffsetDateTime>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(instant) => s.serialize_some(&super::format_timestamp(*instant)),
            None => s.serialize_none(),
        }
    }

    /// Deserialize an optional RFC 3339 timestamp leniently.
    ///
    /// # Errors
    /// Fails only when the value is neither a string nor null.
    pub fn deserialize<'de, D>(d: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.and_then(|value| super::parse_timestamp(&value).ok()))
    }
}
