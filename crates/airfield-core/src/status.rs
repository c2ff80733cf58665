//! Manual status vocabularies and smart-status classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::Date;
use tracing::warn;

use crate::date::days_between;
use crate::task::PpmTask;

/// Manual status of a PPM task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PpmStatus {
    /// Not picked up yet.
    #[default]
    NotStarted,
    /// Being worked on.
    InProgress,
    /// Finished.
    Completed,
}

impl PpmStatus {
    /// All statuses in form order.
    pub const ALL: [Self; 3] = [Self::NotStarted, Self::InProgress, Self::Completed];

    /// Wire and display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

/// Manual status of a CM task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CmStatus {
    /// Reported, nobody on it yet.
    #[default]
    Open,
    /// Being worked on.
    InProgress,
    /// Waiting for spares.
    PendingParts,
    /// Work done.
    Completed,
    /// Signed off.
    Closed,
}

impl CmStatus {
    /// All statuses in form order.
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::InProgress,
        Self::PendingParts,
        Self::Completed,
        Self::Closed,
    ];

    /// Wire and display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::PendingParts => "Pending Parts",
            Self::Completed => "Completed",
            Self::Closed => "Closed",
        }
    }

    /// Whether the task still needs attention.
    #[must_use]
    pub const fn is_unresolved(self) -> bool {
        matches!(self, Self::Open | Self::InProgress | Self::PendingParts)
    }

    /// Fixed display styling; CM tasks have no date-derived status.
    #[must_use]
    pub const fn style(self) -> StatusStyle {
        match self {
            Self::Open => StatusStyle::Overdue,
            Self::InProgress => StatusStyle::InProgress,
            Self::PendingParts => StatusStyle::Upcoming,
            Self::Completed => StatusStyle::Completed,
            Self::Closed => StatusStyle::NotStarted,
        }
    }
}

/// Priority of a CM task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CmPriority {
    /// Can wait.
    Low,
    /// Normal.
    #[default]
    Medium,
    /// Needs attention soon.
    High,
    /// Legacy value from older records; treated like `High`.
    Critical,
}

impl CmPriority {
    /// Priorities offered for new records.
    pub const SELECTABLE: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Wire and display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// `High` or the legacy `Critical`.
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Fixed display styling.
    #[must_use]
    pub const fn style(self) -> StatusStyle {
        match self {
            Self::Low => StatusStyle::NotStarted,
            Self::Medium => StatusStyle::Upcoming,
            Self::High | Self::Critical => StatusStyle::Overdue,
        }
    }

    /// Glyph shown next to the priority.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Low => "⬇️",
            Self::Medium => "🔸",
            Self::High | Self::Critical => "⚠️",
        }
    }
}

macro_rules! label_impls {
    ($ty:ty, $all:expr, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                s.serialize_str(self.as_str())
            }
        }

        // Blank, missing or unknown values fall back to the default label.
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(d: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
                if raw.trim().is_empty() {
                    return Ok(Self::default());
                }
                Ok(raw.parse().unwrap_or_else(|err: UnknownLabel| {
                    let fallback = Self::default();
                    warn!(%err, fallback = fallback.as_str(), "reading unknown label as default");
                    fallback
                }))
            }
        }

        impl FromStr for $ty {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_label(s);
                $all.into_iter()
                    .find(|value| normalize_label(value.as_str()) == wanted)
                    .ok_or_else(|| UnknownLabel {
                        kind: $what,
                        value: s.to_owned(),
                    })
            }
        }
    };
}

label_impls!(PpmStatus, PpmStatus::ALL, "PPM status");
label_impls!(CmStatus, CmStatus::ALL, "CM status");
label_impls!(
    CmPriority,
    [
        CmPriority::Low,
        CmPriority::Medium,
        CmPriority::High,
        CmPriority::Critical
    ],
    "priority"
);

/// A label that does not belong to the expected vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownLabel {
    /// Vocabulary name.
    pub kind: &'static str,
    /// Offending input.
    pub value: String,
}

fn normalize_label(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Presentation class of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusStyle {
    /// Finished work.
    Completed,
    /// Past due.
    Overdue,
    /// Due today.
    DueToday,
    /// Being worked on.
    InProgress,
    /// Due within the upcoming horizon.
    Upcoming,
    /// Nothing pressing.
    NotStarted,
}

impl StatusStyle {
    /// CSS-like class name understood by the presentation layer.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Completed => "status-completed",
            Self::Overdue => "status-overdue",
            Self::DueToday => "status-due-today",
            Self::InProgress => "status-progress",
            Self::Upcoming => "status-upcoming",
            Self::NotStarted => "status-not-started",
        }
    }
}

/// Display status derived from a due date and the manual status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartStatus {
    /// Human-readable status text.
    pub text: String,
    /// Styling class.
    pub style: StatusStyle,
    /// Badge glyph.
    pub badge: &'static str,
    /// Ascending urgency, 1 is most urgent.
    pub sort_priority: u8,
}

impl fmt::Display for SmartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.badge, self.text)
    }
}

/// Tunables for [`classify_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierOptions {
    /// Not-started tasks due within this many days are flagged as upcoming.
    pub upcoming_days: i64,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self { upcoming_days: 3 }
    }
}

/// Classify a PPM task with the default options.
#[must_use]
pub fn classify(task: &PpmTask, today: Date) -> SmartStatus {
    classify_with(task, today, ClassifierOptions::default())
}

/// Classify a PPM task.
///
/// Completed short-circuits everything; otherwise date-derived urgency
/// (overdue, due today) wins over the manual status.
#[must_use]
pub fn classify_with(task: &PpmTask, today: Date, options: ClassifierOptions) -> SmartStatus {
    let status = task.status;
    let diff = days_between(task.due_date, today);

    let (text, style, badge, sort_priority) = if status == PpmStatus::Completed {
        (status.as_str().to_owned(), StatusStyle::Completed, "✓", 5)
    } else if diff < 0 {
        (
            format!("OVERDUE ({} days)", diff.unsigned_abs()),
            StatusStyle::Overdue,
            "⚠️",
            1,
        )
    } else if diff == 0 {
        ("DUE TODAY".to_owned(), StatusStyle::DueToday, "🔔", 2)
    } else if status == PpmStatus::InProgress {
        (status.as_str().to_owned(), StatusStyle::InProgress, "⏳", 3)
    } else if diff <= options.upcoming_days {
        let plural = if diff > 1 { "s" } else { "" };
        (
            format!("Due in {diff} day{plural}"),
            StatusStyle::Upcoming,
            "📅",
            4,
        )
    } else {
        (status.as_str().to_owned(), StatusStyle::NotStarted, "○", 6)
    };

    SmartStatus {
        text,
        style,
        badge,
        sort_priority,
    }
}

/// Stable sort of PPM tasks by smart-status urgency.
pub fn sort_by_urgency(tasks: &mut [&PpmTask], today: Date, options: ClassifierOptions) {
    tasks.sort_by_cached_key(|task| classify_with(task, today, options).sort_priority);
}
