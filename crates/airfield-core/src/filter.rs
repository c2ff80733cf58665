//! Filtering of task collections by category, free text and time window.

use thiserror::Error;
use time::{Date, Duration, OffsetDateTime};
use tracing::debug;

use crate::date::{format_iso, format_timestamp};
use crate::id::TaskId;
use crate::task::{CategoryField, TrackedTask};
use crate::text_matcher::TextMatcher;

/// Window bounds given in the wrong order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("window start {start} is after its end {end}")]
pub struct InvertedWindow {
    /// Rendered start bound.
    pub start: String,
    /// Rendered end bound.
    pub end: String,
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: Date,
    to: Date,
}

impl DateRange {
    /// Create a range covering `from..=to`.
    ///
    /// # Errors
    /// Returns [`InvertedWindow`] when `from` is after `to`.
    pub fn new(from: Date, to: Date) -> Result<Self, InvertedWindow> {
        if from > to {
            return Err(InvertedWindow {
                start: format_iso(from),
                end: format_iso(to),
            });
        }
        Ok(Self { from, to })
    }

    /// The calendar month containing `date`.
    #[must_use]
    pub fn month_of(date: Date) -> Self {
        let from = date.replace_day(1).unwrap_or(date);
        let last_day = time::util::days_in_year_month(date.year(), date.month());
        let to = date.replace_day(last_day).unwrap_or(date);
        Self { from, to }
    }

    /// First day.
    #[must_use]
    pub const fn from(&self) -> Date {
        self.from
    }

    /// Last day.
    #[must_use]
    pub const fn to(&self) -> Date {
        self.to
    }

    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: Date) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Inclusive window over modification instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl ActivityWindow {
    /// Create a window covering `start..=end`.
    ///
    /// # Errors
    /// Returns [`InvertedWindow`] when `start` is after `end`.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, InvertedWindow> {
        if start > end {
            return Err(InvertedWindow {
                start: format_timestamp(start),
                end: format_timestamp(end),
            });
        }
        Ok(Self { start, end })
    }

    /// Window ending at `now` and reaching `span` into the past.
    #[must_use]
    pub fn trailing(now: OffsetDateTime, span: Duration) -> Self {
        let start = now.checked_sub(span.abs()).unwrap_or(now);
        Self { start, end: now }
    }

    /// Start instant.
    #[must_use]
    pub const fn start(&self) -> OffsetDateTime {
        self.start
    }

    /// End instant.
    #[must_use]
    pub const fn end(&self) -> OffsetDateTime {
        self.end
    }

    /// Whether `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Time constraint applied by a [`TaskFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Match on the task's schedule date (PPM due date, CM report date).
    Calendar(DateRange),
    /// Match on the task's last modification instant.
    Activity(ActivityWindow),
}

/// Exact match of one categorical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    /// Field compared.
    pub field: CategoryField,
    /// Required value.
    pub value: String,
}

impl CategoryFilter {
    fn matches<T: TrackedTask>(&self, task: &T) -> bool {
        task.category(self.field) == Some(self.value.as_str())
    }
}

/// Composite filter; every configured predicate must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    categories: Vec<CategoryFilter>,
    text: Option<TextMatcher>,
    window: Option<TimeWindow>,
}

/// Result of [`TaskFilter::evaluate`].
#[derive(Debug)]
pub struct FilterOutcome<'a, T> {
    /// Matching tasks in input order.
    pub matched: Vec<&'a T>,
    /// Tasks excluded from an activity window because they carry no
    /// modification instant.
    pub incomplete: Vec<TaskId>,
}

impl TaskFilter {
    /// Start building a filter.
    #[must_use]
    pub fn builder() -> TaskFilterBuilder {
        TaskFilterBuilder::new()
    }

    /// Whether the filter lets everything through.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.text.is_none() && self.window.is_none()
    }

    /// Configured time window.
    #[must_use]
    pub const fn window(&self) -> Option<&TimeWindow> {
        self.window.as_ref()
    }

    /// Whether a single task passes every predicate.
    pub fn matches<T: TrackedTask>(&self, task: &T) -> bool {
        self.categories.iter().all(|category| category.matches(task))
            && self.text.as_ref().is_none_or(|matcher| matcher.matches(task))
            && self.window.as_ref().is_none_or(|window| window_matches(window, task))
    }

    /// Matching tasks in input order.
    pub fn apply<'a, T: TrackedTask>(&self, tasks: &'a [T]) -> Vec<&'a T> {
        tasks.iter().filter(|task| self.matches(*task)).collect()
    }

    /// Like [`TaskFilter::apply`], also reporting records that could not be
    /// placed in an activity window.
    pub fn evaluate<'a, T: TrackedTask>(&self, tasks: &'a [T]) -> FilterOutcome<'a, T> {
        let mut incomplete = Vec::new();
        if matches!(self.window, Some(TimeWindow::Activity(_))) {
            incomplete.extend(
                tasks
                    .iter()
                    .filter(|task| task.updated_at().is_none())
                    .map(TrackedTask::id),
            );
        }
        if !incomplete.is_empty() {
            debug!(
                kind = %T::KIND,
                count = incomplete.len(),
                "tasks without modification time skipped by activity window"
            );
        }
        FilterOutcome {
            matched: self.apply(tasks),
            incomplete,
        }
    }
}

fn window_matches<T: TrackedTask>(window: &TimeWindow, task: &T) -> bool {
    match window {
        TimeWindow::Calendar(range) => range.contains(task.schedule_date()),
        TimeWindow::Activity(activity) => task
            .updated_at()
            .is_some_and(|instant| activity.contains(instant)),
    }
}

/// Builder for [`TaskFilter`] from already typed values.
#[derive(Debug, Clone, Default)]
pub struct TaskFilterBuilder {
    filter: TaskFilter,
}

impl TaskFilterBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn category(mut self, field: CategoryField, value: impl Into<String>) -> Self {
        self.filter.categories.push(CategoryFilter {
            field,
            value: value.into(),
        });
        self
    }

    /// Free-text query; blank text clears it.
    #[must_use]
    pub fn text(mut self, query: &str) -> Self {
        self.filter.text = TextMatcher::new(query);
        self
    }

    /// Time window.
    #[must_use]
    pub fn window(mut self, window: TimeWindow) -> Self {
        self.filter.window = Some(window);
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> TaskFilter {
        self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::Frequency;
    use crate::status::{CmPriority, CmStatus, PpmStatus};
    use crate::task::{CmTask, PpmTask};
    use time::macros::{date, datetime};

    fn ppm(description: &str, shift: &str, due: Date) -> PpmTask {
        PpmTask {
            description: description.into(),
            shift_type: shift.into(),
            ..PpmTask::new(due)
        }
    }

    fn sample() -> Vec<PpmTask> {
        vec![
            ppm("Runway edge lights", "Day", date!(2025 - 01 - 05)),
            ppm("PAPI calibration", "Night", date!(2025 - 01 - 10)),
            ppm("Apron floodlights", "Day", date!(2025 - 02 - 01)),
        ]
    }

    fn descriptions<'a>(tasks: &[&'a PpmTask]) -> Vec<&'a str> {
        tasks.iter().map(|t| t.description.as_str()).collect()
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let tasks = sample();
        let filter = TaskFilter::builder().text("   ").build();
        assert!(filter.is_empty());
        assert_eq!(
            descriptions(&filter.apply(&tasks)),
            vec!["Runway edge lights", "PAPI calibration", "Apron floodlights"]
        );
    }

    #[test]
    fn predicates_compose_with_and() {
        let tasks = sample();
        let filter = TaskFilter::builder()
            .category(CategoryField::ShiftType, "Day")
            .text("LIGHTS")
            .window(TimeWindow::Calendar(
                DateRange::new(date!(2025 - 01 - 01), date!(2025 - 01 - 31))
                    .unwrap_or_else(|err| panic!("valid range: {err}")),
            ))
            .build();
        assert_eq!(descriptions(&filter.apply(&tasks)), vec!["Runway edge lights"]);
    }

    #[test]
    fn categories_cover_status_and_frequency() {
        let mut tasks = sample();
        tasks[1].frequency = Some(Frequency::Monthly);
        tasks[2].status = PpmStatus::Completed;
        let monthly = TaskFilter::builder()
            .category(CategoryField::Frequency, "Monthly")
            .build();
        assert_eq!(descriptions(&monthly.apply(&tasks)), vec!["PAPI calibration"]);
        let completed = TaskFilter::builder()
            .category(CategoryField::Status, "Completed")
            .build();
        assert_eq!(descriptions(&completed.apply(&tasks)), vec!["Apron floodlights"]);
    }

    #[test]
    fn cm_status_and_priority_filters() {
        let mut open = CmTask::new(date!(2025 - 01 - 01));
        open.priority = CmPriority::High;
        let mut parts = CmTask::new(date!(2025 - 01 - 02));
        parts.status = CmStatus::PendingParts;
        let tasks = vec![open, parts];
        let filter = TaskFilter::builder()
            .category(CategoryField::Status, "Pending Parts")
            .build();
        assert_eq!(filter.apply(&tasks).len(), 1);
        let high = TaskFilter::builder()
            .category(CategoryField::Priority, "High")
            .build();
        assert_eq!(high.apply(&tasks)[0].date_reported, date!(2025 - 01 - 01));
        let shift = TaskFilter::builder()
            .category(CategoryField::ShiftType, "Day")
            .build();
        assert!(shift.apply(&tasks).is_empty());
    }

    #[test]
    fn calendar_range_is_inclusive() {
        let tasks = sample();
        let range = DateRange::new(date!(2025 - 01 - 05), date!(2025 - 01 - 10))
            .unwrap_or_else(|err| panic!("valid range: {err}"));
        let filter = TaskFilter::builder().window(TimeWindow::Calendar(range)).build();
        assert_eq!(
            descriptions(&filter.apply(&tasks)),
            vec!["Runway edge lights", "PAPI calibration"]
        );
    }

    #[test]
    fn inverted_windows_are_rejected() {
        assert!(DateRange::new(date!(2025 - 01 - 02), date!(2025 - 01 - 01)).is_err());
        assert!(
            ActivityWindow::new(datetime!(2025-01-02 00:00 UTC), datetime!(2025-01-01 00:00 UTC))
                .is_err()
        );
    }

    #[test]
    fn activity_window_is_inclusive_and_skips_missing_timestamps() {
        let start = datetime!(2025-01-01 08:00 UTC);
        let end = datetime!(2025-01-01 10:00 UTC);
        let mut tasks = sample();
        tasks[0].updated_at = Some(start);
        tasks[1].updated_at = Some(end);
        let window = ActivityWindow::new(start, end)
            .unwrap_or_else(|err| panic!("valid window: {err}"));
        let filter = TaskFilter::builder().window(TimeWindow::Activity(window)).build();
        let outcome = filter.evaluate(&tasks);
        assert_eq!(
            descriptions(&outcome.matched),
            vec!["Runway edge lights", "PAPI calibration"]
        );
        assert_eq!(outcome.incomplete, vec![tasks[2].id]);
    }

    #[test]
    fn default_windows() {
        let month = DateRange::month_of(date!(2024 - 02 - 14));
        assert_eq!(month.from(), date!(2024 - 02 - 01));
        assert_eq!(month.to(), date!(2024 - 02 - 29));
        let now = datetime!(2025-01-01 10:00 UTC);
        let recent = ActivityWindow::trailing(now, Duration::hours(2));
        assert_eq!(recent.start(), datetime!(2025-01-01 08:00 UTC));
        assert_eq!(recent.end(), now);
    }
}
