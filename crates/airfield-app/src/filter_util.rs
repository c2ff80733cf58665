use airfield_core::date::{DateError, parse_date};
use airfield_core::filter::{ActivityWindow, DateRange, InvertedWindow, TaskFilter, TimeWindow};
use airfield_core::recurrence::Frequency;
use airfield_core::status::{CmPriority, CmStatus, PpmStatus};
use airfield_core::task::{CategoryField, TaskKind};
use thiserror::Error;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Selector value meaning "no constraint".
pub const ALL: &str = "All";

/// Error type returned while constructing task filters from user-facing inputs.
#[derive(Debug, Error)]
pub enum FilterBuildError {
    /// A selector value outside the field's vocabulary.
    #[error("invalid {field:?} value: {value}")]
    InvalidValue {
        /// Field being filtered.
        field: CategoryField,
        /// Offending input.
        value: String,
    },
    /// Field does not exist on this kind of task.
    #[error("{kind} tasks cannot be filtered by {field:?}")]
    NotApplicable {
        /// Field being filtered.
        field: CategoryField,
        /// Kind of the filtered collection.
        kind: TaskKind,
    },
    /// A date bound is not a valid `YYYY-MM-DD` date.
    #[error("invalid {field} date: {source}")]
    InvalidDate {
        /// Which bound.
        field: &'static str,
        /// Parse failure.
        #[source]
        source: DateError,
    },
    /// A time bound is neither RFC 3339 nor `YYYY-MM-DDTHH:MM`.
    #[error("invalid {field} timestamp: {source}")]
    InvalidTimestamp {
        /// Which bound.
        field: &'static str,
        /// Parse failure.
        #[source]
        source: time::error::Parse,
    },
    /// Only one bound of a window was given.
    #[error("{missing} is required when {given} is set")]
    IncompleteWindow {
        /// Bound that was given.
        given: &'static str,
        /// Bound that is missing.
        missing: &'static str,
    },
    /// Window bounds in the wrong order.
    #[error(transparent)]
    Inverted(#[from] InvertedWindow),
}

impl FilterBuildError {
    /// Convert the error into a message that is friendly for end-users.
    #[must_use]
    pub fn describe_user_facing(&self) -> String {
        match self {
            Self::InvalidDate { .. } => "Please enter valid dates".into(),
            Self::InvalidTimestamp { .. } => "Please enter valid mission start and end times".into(),
            Self::Inverted(_) => "Start must be before end".into(),
            other => other.to_string(),
        }
    }
}

/// Result alias for filter construction helpers.
pub type FilterBuildResult<T> = Result<T, FilterBuildError>;

/// Builder that accepts user-facing strings and normalizes them into [`TaskFilter`] values.
#[derive(Debug, Clone)]
pub struct TaskFilterBuilder {
    kind: TaskKind,
    categories: Vec<(CategoryField, String)>,
    text: Option<String>,
    window: Option<TimeWindow>,
}

impl TaskFilterBuilder {
    /// Create an empty builder for one collection.
    #[must_use]
    pub const fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            categories: Vec::new(),
            text: None,
            window: None,
        }
    }

    /// Add a categorical selector. `None`, blank and `All` add nothing.
    ///
    /// # Errors
    /// Returns an error if the field does not apply to this kind of task or
    /// the value is not part of the field's vocabulary.
    pub fn with_category(mut self, field: CategoryField, value: Option<&str>) -> FilterBuildResult<Self> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
        else {
            return Ok(self);
        };
        if !applies_to(self.kind, field) {
            return Err(FilterBuildError::NotApplicable {
                field,
                kind: self.kind,
            });
        }
        let canonical = canonical_value(self.kind, field, raw)?;
        self.categories.push((field, canonical));
        Ok(self)
    }

    /// Configure the optional search text (whitespace-only inputs become `None`).
    #[must_use]
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text.and_then(|raw| {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });
        self
    }

    /// Restrict to schedule dates within `from..=to` (`YYYY-MM-DD`).
    ///
    /// # Errors
    /// Returns an error if a bound is invalid, only one bound is given, or
    /// the bounds are inverted.
    pub fn with_date_range(mut self, from: Option<&str>, to: Option<&str>) -> FilterBuildResult<Self> {
        let from = parse_optional(from, |raw| {
            parse_date(raw).map_err(|source| FilterBuildError::InvalidDate { field: "from", source })
        })?;
        let to = parse_optional(to, |raw| {
            parse_date(raw).map_err(|source| FilterBuildError::InvalidDate { field: "to", source })
        })?;
        self.window = match (from, to) {
            (None, None) => self.window,
            (Some(from), Some(to)) => Some(TimeWindow::Calendar(DateRange::new(from, to)?)),
            (Some(_), None) => return Err(incomplete("from", "to")),
            (None, Some(_)) => return Err(incomplete("to", "from")),
        };
        Ok(self)
    }

    /// Restrict to tasks modified within `start..=end`.
    ///
    /// # Errors
    /// Returns an error if a bound is invalid, only one bound is given, or
    /// the bounds are inverted.
    pub fn with_activity_window(mut self, start: Option<&str>, end: Option<&str>) -> FilterBuildResult<Self> {
        let start = parse_optional(start, |raw| parse_instant("start", raw))?;
        let end = parse_optional(end, |raw| parse_instant("end", raw))?;
        self.window = match (start, end) {
            (None, None) => self.window,
            (Some(start), Some(end)) => Some(TimeWindow::Activity(ActivityWindow::new(start, end)?)),
            (Some(_), None) => return Err(incomplete("start", "end")),
            (None, Some(_)) => return Err(incomplete("end", "start")),
        };
        Ok(self)
    }

    /// Build the final [`TaskFilter`].
    #[must_use]
    pub fn build(self) -> TaskFilter {
        let mut builder = TaskFilter::builder();
        for (field, value) in self.categories {
            builder = builder.category(field, value);
        }
        if let Some(text) = self.text {
            builder = builder.text(&text);
        }
        if let Some(window) = self.window {
            builder = builder.window(window);
        }
        builder.build()
    }
}

/// Parse an instant given as RFC 3339 or as a zone-less `YYYY-MM-DDTHH:MM`
/// (read as UTC).
///
/// # Errors
/// Returns the RFC 3339 parse error when neither form matches.
pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let trimmed = s.trim();
    airfield_core::date::parse_timestamp(trimmed).or_else(|err| {
        PrimitiveDateTime::parse(trimmed, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|_| err)
    })
}

const fn applies_to(kind: TaskKind, field: CategoryField) -> bool {
    match field {
        CategoryField::Status => true,
        CategoryField::ShiftType | CategoryField::TaskType | CategoryField::Frequency => {
            matches!(kind, TaskKind::Ppm)
        }
        CategoryField::Priority | CategoryField::Location | CategoryField::AssignedTo => {
            matches!(kind, TaskKind::Cm)
        }
    }
}

fn canonical_value(kind: TaskKind, field: CategoryField, raw: &str) -> FilterBuildResult<String> {
    let invalid = || FilterBuildError::InvalidValue {
        field,
        value: raw.to_owned(),
    };
    let label = match (field, kind) {
        (CategoryField::Status, TaskKind::Ppm) => raw.parse::<PpmStatus>().map_err(|_| invalid())?.as_str(),
        (CategoryField::Status, TaskKind::Cm) => raw.parse::<CmStatus>().map_err(|_| invalid())?.as_str(),
        (CategoryField::Frequency, _) => raw.parse::<Frequency>().map_err(|_| invalid())?.as_str(),
        (CategoryField::Priority, _) => raw.parse::<CmPriority>().map_err(|_| invalid())?.as_str(),
        _ => return Ok(raw.to_owned()),
    };
    Ok(label.to_owned())
}

fn parse_optional<T>(
    value: Option<&str>,
    parse: impl FnOnce(&str) -> FilterBuildResult<T>,
) -> FilterBuildResult<Option<T>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse(raw).map(Some),
    }
}

fn parse_instant(field: &'static str, raw: &str) -> FilterBuildResult<OffsetDateTime> {
    parse_timestamp(raw).map_err(|source| FilterBuildError::InvalidTimestamp { field, source })
}

const fn incomplete(given: &'static str, missing: &'static str) -> FilterBuildError {
    FilterBuildError::IncompleteWindow { given, missing }
}
