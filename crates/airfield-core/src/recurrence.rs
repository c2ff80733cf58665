//! Next-due-date computation for recurring PPM tasks.
//!
//! Month arithmetic normalizes overflow: the day-of-month is kept and any
//! excess rolls into the following month, so `2024-01-31` plus one month is
//! `2024-03-02` and `2024-02-29` plus one year is `2025-03-01`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Duration, Month};
use tracing::warn;

use crate::date::{format_iso, parse_date};

/// Recurrence tag attached to a PPM task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Every calendar month.
    Monthly,
    /// Every three calendar months.
    Quarterly,
    /// Every calendar year.
    Yearly,
}

impl Frequency {
    /// All tags in schedule order.
    pub const ALL: [Self; 5] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Yearly,
    ];

    /// Wire and display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for frequency labels outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown frequency: {0}")]
pub struct UnknownFrequency(pub String);

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|freq| freq.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownFrequency(s.to_owned()))
    }
}

impl Serialize for Frequency {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional frequency fields.
///
/// Forms submitted without a frequency store an empty string; that and any
/// unrecognized tag read back as `None`, which leaves the due date unchanged on
/// completion.
pub mod optional {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Frequency;

    /// Serialize as the label or an empty string.
    ///
    /// # Errors
    /// Propagates serializer failures.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<Frequency>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(value.map_or("", Frequency::as_str))
    }

    /// Deserialize leniently.
    ///
    /// # Errors
    /// Fails only when the value is neither a string nor null.
    pub fn deserialize<'de, D>(d: D) -> Result<Option<Frequency>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.and_then(|value| value.parse().ok()))
    }
}

/// Compute the next due date after `current` for the given frequency.
///
/// Returns `current` unchanged if the arithmetic would leave the supported
/// calendar range.
#[must_use]
pub fn next_due_date(current: Date, frequency: Frequency) -> Date {
    let next = match frequency {
        Frequency::Daily => current.checked_add(Duration::days(1)),
        Frequency::Weekly => current.checked_add(Duration::weeks(1)),
        Frequency::Monthly => add_months(current, 1),
        Frequency::Quarterly => add_months(current, 3),
        Frequency::Yearly => add_months(current, 12),
    };
    next.unwrap_or_else(|| {
        warn!(date = %format_iso(current), %frequency, "next due date out of range");
        current
    })
}

/// String-level entry point used for stored records.
///
/// An unrecognized frequency returns `current` unchanged. An invalid `current`
/// fails closed to `today` and logs a data-integrity warning.
#[must_use]
pub fn next_due_date_str(current: &str, frequency: &str, today: Date) -> String {
    let date = match parse_date(current) {
        Ok(date) => date,
        Err(err) => {
            warn!(current, %err, "invalid due date; falling back to today");
            return format_iso(today);
        }
    };
    frequency.parse::<Frequency>().map_or_else(
        |_| current.to_owned(),
        |freq| format_iso(next_due_date(date, freq)),
    )
}

fn add_months(date: Date, months: i32) -> Option<Date> {
    let month_index = date.year() * 12 + i32::from(u8::from(date.month())) - 1 + months;
    let year = month_index.div_euclid(12);
    let month = u8::try_from(month_index.rem_euclid(12) + 1).ok()?;
    let first = Date::from_calendar_date(year, Month::try_from(month).ok()?, 1).ok()?;
    first.checked_add(Duration::days(i64::from(date.day()) - 1))
}
