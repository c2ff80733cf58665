//! Application layer of the airfield maintenance tracker.
//!
//! This crate owns the task collections, persists them through the store
//! crate, and provides the command handlers, report and export builders
//! shared by every front end.

pub mod config;
pub mod csv_export;
pub mod filter_util;
pub mod report;
pub mod service;
pub mod sync_guard;
pub mod task_repository;

// Re-exports for convenience
pub use config::TrackerConfig;
pub use csv_export::{CsvTable, ExportError, ExportOutcome, export_csv, export_json};
pub use filter_util::{FilterBuildError, TaskFilterBuilder, parse_timestamp};
pub use report::{ReportBuilder, ReportDocument, ReportError, ReportWindow};
pub use service::{CmInput, PpmInput, PpmSaved, TaskCommandError, TaskService};
pub use sync_guard::{PendingWrite, SyncGuard};
pub use task_repository::{CleanReport, LoadReport, Notice, RemotePoll, SaveOutcome, TaskRepository};
