//! Dashboard counters, report summaries and completion history.

use time::Date;

use crate::date::days_between;
use crate::status::{CmStatus, PpmStatus};
use crate::task::{CmTask, PpmTask};

/// Headline counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    /// PPM tasks due today and not completed.
    pub due_today: usize,
    /// PPM tasks past due and not completed.
    pub overdue: usize,
    /// PPM tasks in progress.
    pub in_progress: usize,
    /// CM tasks still unresolved.
    pub open_cm: usize,
}

impl DashboardCounts {
    /// Recompute every counter from the current collections.
    #[must_use]
    pub fn compute(ppm: &[PpmTask], cm: &[CmTask], today: Date) -> Self {
        let mut counts = Self::default();
        for task in ppm {
            if task.status == PpmStatus::InProgress {
                counts.in_progress += 1;
            }
            if task.status == PpmStatus::Completed {
                continue;
            }
            match days_between(task.due_date, today) {
                0 => counts.due_today += 1,
                diff if diff < 0 => counts.overdue += 1,
                _ => {}
            }
        }
        counts.open_cm = cm.iter().filter(|task| task.status.is_unresolved()).count();
        counts
    }
}

/// PPM breakdown printed at the top of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PpmSummary {
    /// Tasks in the selection.
    pub total: usize,
    /// Completed.
    pub completed: usize,
    /// In progress.
    pub in_progress: usize,
    /// Not started.
    pub not_started: usize,
    /// Past due and not completed.
    pub overdue: usize,
    /// Tasks carrying at least one photo.
    pub with_photos: usize,
}

impl PpmSummary {
    /// Summarize a selection of PPM tasks.
    #[must_use]
    pub fn compute<'a, I>(tasks: I, today: Date) -> Self
    where
        I: IntoIterator<Item = &'a PpmTask>,
    {
        tasks.into_iter().fold(Self::default(), |mut summary, task| {
            summary.total += 1;
            match task.status {
                PpmStatus::Completed => summary.completed += 1,
                PpmStatus::InProgress => summary.in_progress += 1,
                PpmStatus::NotStarted => summary.not_started += 1,
            }
            if task.status != PpmStatus::Completed && days_between(task.due_date, today) < 0 {
                summary.overdue += 1;
            }
            if !task.photos.is_empty() {
                summary.with_photos += 1;
            }
            summary
        })
    }
}

/// CM breakdown printed at the top of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CmSummary {
    /// Tasks in the selection.
    pub total: usize,
    /// Open.
    pub open: usize,
    /// In progress.
    pub in_progress: usize,
    /// Waiting for parts.
    pub pending_parts: usize,
    /// Completed.
    pub completed: usize,
    /// Closed.
    pub closed: usize,
    /// High or legacy critical priority.
    pub high_priority: usize,
    /// Tasks carrying at least one photo.
    pub with_photos: usize,
}

impl CmSummary {
    /// Summarize a selection of CM tasks.
    #[must_use]
    pub fn compute<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a CmTask>,
    {
        tasks.into_iter().fold(Self::default(), |mut summary, task| {
            summary.total += 1;
            match task.status {
                CmStatus::Open => summary.open += 1,
                CmStatus::InProgress => summary.in_progress += 1,
                CmStatus::PendingParts => summary.pending_parts += 1,
                CmStatus::Completed => summary.completed += 1,
                CmStatus::Closed => summary.closed += 1,
            }
            if task.priority.is_high() {
                summary.high_priority += 1;
            }
            if !task.photos.is_empty() {
                summary.with_photos += 1;
            }
            summary
        })
    }
}

/// Default number of entries in the completion history.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// PPM tasks that have been completed at least once, most recent first.
#[must_use]
pub fn completion_history(ppm: &[PpmTask], limit: usize) -> Vec<&PpmTask> {
    let mut done: Vec<&PpmTask> = ppm.iter().filter(|task| task.last_completed.is_some()).collect();
    done.sort_by(|a, b| b.last_completed.cmp(&a.last_completed));
    done.truncate(limit);
    done
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::CmPriority;
    use crate::task::Photo;
    use time::macros::{date, datetime};

    fn ppm(due: Date, status: PpmStatus) -> PpmTask {
        PpmTask {
            status,
            ..PpmTask::new(due)
        }
    }

    fn cm(status: CmStatus, priority: CmPriority) -> CmTask {
        CmTask {
            status,
            priority,
            ..CmTask::new(date!(2025 - 01 - 01))
        }
    }

    #[test]
    fn dashboard_excludes_completed_from_due_counts() {
        let today = date!(2025 - 01 - 10);
        let ppm_tasks = vec![
            ppm(today, PpmStatus::NotStarted),
            ppm(today, PpmStatus::Completed),
            ppm(date!(2025 - 01 - 01), PpmStatus::InProgress),
            ppm(date!(2025 - 01 - 01), PpmStatus::Completed),
            ppm(date!(2025 - 02 - 01), PpmStatus::InProgress),
        ];
        let cm_tasks = vec![
            cm(CmStatus::Open, CmPriority::Low),
            cm(CmStatus::InProgress, CmPriority::Low),
            cm(CmStatus::PendingParts, CmPriority::Low),
            cm(CmStatus::Completed, CmPriority::Low),
            cm(CmStatus::Closed, CmPriority::Low),
        ];
        let counts = DashboardCounts::compute(&ppm_tasks, &cm_tasks, today);
        assert_eq!(
            counts,
            DashboardCounts {
                due_today: 1,
                overdue: 1,
                in_progress: 2,
                open_cm: 3,
            }
        );
    }

    #[test]
    fn summaries_count_each_bucket() {
        let today = date!(2025 - 01 - 10);
        let mut with_photo = ppm(date!(2025 - 01 - 01), PpmStatus::NotStarted);
        with_photo
            .photos
            .push(Photo::new("a.png", "data:image/png;base64,AA==", datetime!(2025-01-01 00:00 UTC)));
        let ppm_tasks = [with_photo, ppm(date!(2025 - 01 - 01), PpmStatus::Completed)];
        let summary = PpmSummary::compute(&ppm_tasks, today);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.with_photos, 1);

        let cm_tasks = [
            cm(CmStatus::Open, CmPriority::Critical),
            cm(CmStatus::Closed, CmPriority::High),
            cm(CmStatus::PendingParts, CmPriority::Medium),
        ];
        let summary = CmSummary::compute(&cm_tasks);
        assert_eq!(summary.high_priority, 2);
        assert_eq!(summary.pending_parts, 1);
        assert_eq!(summary.closed, 1);
    }

    #[test]
    fn history_is_most_recent_first_and_limited() {
        let mut tasks: Vec<PpmTask> = (1..=4)
            .map(|_| ppm(date!(2025 - 01 - 01), PpmStatus::NotStarted))
            .collect();
        tasks[0].last_completed = Some(datetime!(2025-01-02 00:00 UTC));
        tasks[2].last_completed = Some(datetime!(2025-01-05 00:00 UTC));
        tasks[3].last_completed = Some(datetime!(2025-01-03 00:00 UTC));
        let history = completion_history(&tasks, 2);
        let ids: Vec<_> = history.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![tasks[2].id, tasks[3].id]);
        assert_eq!(completion_history(&tasks, DEFAULT_HISTORY_LIMIT).len(), 3);
    }
}
