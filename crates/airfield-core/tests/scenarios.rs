use airfield_core::dashboard::DashboardCounts;
use airfield_core::filter::{ActivityWindow, TaskFilter, TimeWindow};
use airfield_core::recurrence::{Frequency, next_due_date};
use airfield_core::status::{PpmStatus, StatusStyle, classify};
use airfield_core::task::{Completion, PpmTask};
use time::macros::{date, datetime};

#[test]
fn upcoming_task_turns_overdue_after_due_date() {
    let task = PpmTask::new(date!(2025 - 01 - 01));

    let before = classify(&task, date!(2024 - 12 - 30));
    assert_eq!(before.text, "Due in 2 days");
    assert_eq!(before.sort_priority, 4);
    assert_eq!(before.style, StatusStyle::Upcoming);

    let after = classify(&task, date!(2025 - 01 - 02));
    assert_eq!(after.text, "OVERDUE (1 days)");
    assert_eq!(after.sort_priority, 1);
}

#[test]
fn completing_weekly_task_schedules_next_week() {
    let mut task = PpmTask {
        frequency: Some(Frequency::Weekly),
        ..PpmTask::new(date!(2025 - 01 - 01))
    };
    let outcome = task.record_completion(datetime!(2025-01-01 16:30 UTC));
    assert_eq!(outcome, Completion::Rescheduled(date!(2025 - 01 - 08)));
    assert_eq!(task.status, PpmStatus::NotStarted);

    let counts = DashboardCounts::compute(&[task], &[], date!(2025 - 01 - 01));
    assert_eq!(counts.due_today, 0);
    assert_eq!(counts.overdue, 0);
}

#[test]
fn month_end_recurrences_normalize() {
    assert_eq!(
        next_due_date(date!(2024 - 01 - 31), Frequency::Monthly),
        date!(2024 - 03 - 02)
    );
    assert_eq!(
        next_due_date(date!(2024 - 03 - 31), Frequency::Quarterly),
        date!(2024 - 07 - 01)
    );
}

#[test]
fn mission_window_includes_both_bounds_and_skips_legacy_records() {
    let start = datetime!(2025-03-01 06:00 UTC);
    let end = datetime!(2025-03-01 08:00 UTC);
    let tasks = vec![
        PpmTask {
            updated_at: Some(start),
            ..PpmTask::new(date!(2025 - 03 - 01))
        },
        PpmTask {
            updated_at: Some(end),
            ..PpmTask::new(date!(2025 - 03 - 01))
        },
        PpmTask {
            updated_at: Some(datetime!(2025-03-01 08:00:01 UTC)),
            ..PpmTask::new(date!(2025 - 03 - 01))
        },
        PpmTask::new(date!(2025 - 03 - 01)),
    ];
    let window = ActivityWindow::new(start, end).unwrap_or_else(|err| panic!("valid window: {err}"));
    let filter = TaskFilter::builder().window(TimeWindow::Activity(window)).build();

    let outcome = filter.evaluate(&tasks);
    let ids: Vec<_> = outcome.matched.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![tasks[0].id, tasks[1].id]);
    assert_eq!(outcome.incomplete, vec![tasks[3].id]);
}
