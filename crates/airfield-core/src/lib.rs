//! Domain types and scheduling logic for the airfield maintenance tracker.

/// Dashboard counters, summaries and completion history.
pub mod dashboard;
/// Calendar-date helpers.
pub mod date;
/// Collection filtering.
pub mod filter;
/// Identifier types.
pub mod id;
/// Recurrence of preventive maintenance.
pub mod recurrence;
/// Manual statuses and smart-status classification.
pub mod status;
/// Task records.
pub mod task;
/// Free-text search.
pub mod text_matcher;

pub use dashboard::{CmSummary, DashboardCounts, PpmSummary, completion_history};
pub use date::DateError;
pub use filter::{ActivityWindow, DateRange, TaskFilter, TaskFilterBuilder, TimeWindow};
pub use id::TaskId;
pub use recurrence::Frequency;
pub use status::{CmPriority, CmStatus, PpmStatus, SmartStatus, StatusStyle, classify};
pub use task::{CmTask, Photo, PpmTask, Task, TaskKind, TrackedTask};
