//! Command handlers for the task collections.
//!
//! Every mutation is validated before it touches state, applied to the
//! in-memory collection, then persisted through the [`TaskRepository`].

use airfield_core::dashboard::{DashboardCounts, completion_history};
use airfield_core::date::{DateError, parse_date};
use airfield_core::id::TaskId;
use airfield_core::recurrence::Frequency;
use airfield_core::status::{CmPriority, CmStatus, PpmStatus, SmartStatus, classify_with};
use airfield_core::task::{CmTask, Completion, Photo, PpmTask, Task, TaskKind, TrackedTask};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use tracing::info;

use crate::config::TrackerConfig;
use crate::task_repository::{CleanReport, LoadReport, Notice, RemotePoll, TaskRepository};

/// Errors surfaced by [`TaskService`] commands.
#[derive(Debug, Error)]
pub enum TaskCommandError {
    /// A required field was left blank.
    #[error("{field} is required")]
    Required {
        /// Form field.
        field: &'static str,
    },
    /// A date field failed strict validation.
    #[error("Please enter a valid {field}")]
    InvalidDate {
        /// Form field.
        field: &'static str,
        /// Parse failure.
        #[source]
        source: DateError,
    },
    /// A selector value outside its vocabulary.
    #[error("unknown {field} '{value}'")]
    InvalidValue {
        /// Form field.
        field: &'static str,
        /// Offending input.
        value: String,
    },
    /// No task with this id in the collection.
    #[error("{kind} task {id} not found")]
    NotFound {
        /// Collection searched.
        kind: TaskKind,
        /// Requested id.
        id: TaskId,
    },
    /// Photo index past the end of the attachment list.
    #[error("task {id} has {len} photo(s); index {index} is out of range")]
    PhotoIndex {
        /// Task id.
        id: TaskId,
        /// Requested index.
        index: usize,
        /// Number of photos.
        len: usize,
    },
    /// Backing store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] anyhow::Error),
}

/// Result alias for command handlers.
pub type CommandResult<T> = Result<T, TaskCommandError>;

/// PPM form contents as entered by the user.
#[derive(Debug, Clone, Default)]
pub struct PpmInput {
    /// Shift pattern, e.g. "Day".
    pub shift_type: String,
    /// Required free text.
    pub description: String,
    /// Equipment / task category.
    pub task_type: String,
    /// `YYYY-MM-DD`.
    pub due_date: String,
    /// Blank for a one-off task.
    pub frequency: Option<String>,
    /// Blank means Not Started.
    pub status: Option<String>,
    /// Day-shift assignee.
    pub day_shift: String,
    /// Night-shift assignee.
    pub night_shift: String,
}

/// CM form contents as entered by the user.
#[derive(Debug, Clone, Default)]
pub struct CmInput {
    /// Required work order reference.
    pub work_order: String,
    /// Required free text.
    pub description: String,
    /// Who raised the fault.
    pub reported_by: String,
    /// `YYYY-MM-DD`.
    pub date_reported: String,
    /// Blank means Open.
    pub status: Option<String>,
    /// Responsible technician.
    pub assigned_to: String,
    /// Blank means Medium.
    pub priority: Option<String>,
    /// Where on the airfield.
    pub location: String,
}

/// Outcome of saving a PPM form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpmSaved {
    /// Task id.
    pub id: TaskId,
    /// Set when the submission completed the task.
    pub completion: Option<Completion>,
}

struct PpmFields {
    shift_type: String,
    description: String,
    task_type: String,
    due_date: Date,
    frequency: Option<Frequency>,
    status: PpmStatus,
    day_shift: String,
    night_shift: String,
}

impl PpmInput {
    fn validate(self) -> CommandResult<PpmFields> {
        let due_date = parse_date(&self.due_date).map_err(|source| TaskCommandError::InvalidDate {
            field: "due date",
            source,
        })?;
        let frequency = match non_blank(self.frequency.as_deref()) {
            Some(raw) => Some(raw.parse::<Frequency>().map_err(|_| invalid("frequency", raw))?),
            None => None,
        };
        let status = parse_label::<PpmStatus>("status", self.status.as_deref())?;
        Ok(PpmFields {
            shift_type: self.shift_type.trim().to_owned(),
            description: required("description", &self.description)?,
            task_type: self.task_type.trim().to_owned(),
            due_date,
            frequency,
            status,
            day_shift: self.day_shift.trim().to_owned(),
            night_shift: self.night_shift.trim().to_owned(),
        })
    }
}

impl PpmFields {
    fn apply_to(self, task: &mut PpmTask) {
        task.shift_type = self.shift_type;
        task.description = self.description;
        task.task_type = self.task_type;
        task.due_date = self.due_date;
        task.frequency = self.frequency;
        task.status = self.status;
        task.day_shift = self.day_shift;
        task.night_shift = self.night_shift;
    }
}

struct CmFields {
    work_order: String,
    description: String,
    reported_by: String,
    date_reported: Date,
    status: CmStatus,
    assigned_to: String,
    priority: CmPriority,
    location: String,
}

impl CmInput {
    fn validate(self) -> CommandResult<CmFields> {
        let date_reported =
            parse_date(&self.date_reported).map_err(|source| TaskCommandError::InvalidDate {
                field: "report date",
                source,
            })?;
        Ok(CmFields {
            work_order: required("work order", &self.work_order)?,
            description: required("description", &self.description)?,
            reported_by: self.reported_by.trim().to_owned(),
            date_reported,
            status: parse_label::<CmStatus>("status", self.status.as_deref())?,
            assigned_to: self.assigned_to.trim().to_owned(),
            priority: match non_blank(self.priority.as_deref()) {
                Some(raw) => raw.parse().map_err(|_| invalid("priority", raw))?,
                None => CmPriority::Medium,
            },
            location: self.location.trim().to_owned(),
        })
    }
}

impl CmFields {
    fn apply_to(self, task: &mut CmTask) {
        task.work_order = self.work_order;
        task.description = self.description;
        task.reported_by = self.reported_by;
        task.date_reported = self.date_reported;
        task.status = self.status;
        task.assigned_to = self.assigned_to;
        task.priority = self.priority;
        task.location = self.location;
    }
}

/// Service façade owning the repository and the tracker configuration.
pub struct TaskService {
    repo: TaskRepository,
    config: TrackerConfig,
}

impl TaskService {
    /// Service over `repo`; call [`TaskService::start`] before use.
    #[must_use]
    pub const fn new(repo: TaskRepository, config: TrackerConfig) -> Self {
        Self { repo, config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &TaskRepository {
        &self.repo
    }

    /// PPM tasks in display order.
    #[must_use]
    pub fn ppm(&self) -> &[PpmTask] {
        self.repo.ppm()
    }

    /// CM tasks in display order.
    #[must_use]
    pub fn cm(&self) -> &[CmTask] {
        self.repo.cm()
    }

    /// Load stored collections and subscribe to remote changes.
    ///
    /// # Errors
    /// Returns an error when no store can be read.
    pub fn start(&mut self) -> anyhow::Result<LoadReport> {
        let report = self.repo.load()?;
        self.repo.connect();
        Ok(report)
    }

    /// Apply queued remote updates.
    pub fn poll_remote(&mut self, now: OffsetDateTime) -> RemotePoll {
        self.repo.poll_remote(now)
    }

    /// Drain repository notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.repo.take_notices()
    }

    /// Smart status of a PPM task with the configured horizon.
    #[must_use]
    pub fn smart_status(&self, task: &PpmTask, today: Date) -> SmartStatus {
        classify_with(task, today, self.config.classifier_options())
    }

    /// Dashboard counters, recomputed from the current collections.
    #[must_use]
    pub fn dashboard(&self, today: Date) -> DashboardCounts {
        DashboardCounts::compute(self.repo.ppm(), self.repo.cm(), today)
    }

    /// Most recently completed PPM tasks.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<&PpmTask> {
        completion_history(self.repo.ppm(), limit)
    }

    /// Create a PPM task at the front of the list.
    ///
    /// # Errors
    /// Returns an error if validation or persistence fails.
    pub fn create_ppm(&mut self, input: PpmInput, now: OffsetDateTime) -> CommandResult<PpmSaved> {
        let fields = input.validate()?;
        let mut task = PpmTask::with_id(TaskId::issue_after(now), fields.due_date);
        fields.apply_to(&mut task);
        task.created_at = Some(now);
        task.touch(now);
        let completion = complete_if_requested(&mut task, now);
        let id = task.id;
        self.repo.ppm_mut().insert(0, task);
        self.persist(now)?;
        info!(%id, "created PPM task");
        Ok(PpmSaved { id, completion })
    }

    /// Replace the editable fields of a PPM task.
    ///
    /// Identity, creation time, photos and completion history are kept.
    ///
    /// # Errors
    /// Returns an error if validation fails, the task is missing or
    /// persistence fails.
    pub fn update_ppm(&mut self, id: TaskId, input: PpmInput, now: OffsetDateTime) -> CommandResult<PpmSaved> {
        let fields = input.validate()?;
        let task = find_mut(self.repo.ppm_mut(), id)?;
        fields.apply_to(task);
        task.touch(now);
        let completion = complete_if_requested(task, now);
        self.persist(now)?;
        info!(%id, "updated PPM task");
        Ok(PpmSaved { id, completion })
    }

    /// Mark a PPM task done, rescheduling it when it recurs.
    ///
    /// # Errors
    /// Returns an error if the task is missing or persistence fails.
    pub fn complete_ppm(&mut self, id: TaskId, now: OffsetDateTime) -> CommandResult<Completion> {
        let completion = find_mut(self.repo.ppm_mut(), id)?.record_completion(now);
        self.persist(now)?;
        info!(%id, ?completion, "completed PPM task");
        Ok(completion)
    }

    /// Create a CM task at the front of the list.
    ///
    /// # Errors
    /// Returns an error if validation or persistence fails.
    pub fn create_cm(&mut self, input: CmInput, now: OffsetDateTime) -> CommandResult<TaskId> {
        let fields = input.validate()?;
        let mut task = CmTask::with_id(TaskId::issue_after(now), fields.date_reported);
        fields.apply_to(&mut task);
        task.created_date = Some(now);
        task.touch(now);
        let id = task.id;
        self.repo.cm_mut().insert(0, task);
        self.persist(now)?;
        info!(%id, "created CM task");
        Ok(id)
    }

    /// Replace the editable fields of a CM task.
    ///
    /// # Errors
    /// Returns an error if validation fails, the task is missing or
    /// persistence fails.
    pub fn update_cm(&mut self, id: TaskId, input: CmInput, now: OffsetDateTime) -> CommandResult<()> {
        let fields = input.validate()?;
        let task = find_mut(self.repo.cm_mut(), id)?;
        fields.apply_to(task);
        task.touch(now);
        self.persist(now)?;
        info!(%id, "updated CM task");
        Ok(())
    }

    /// Delete a task and hand back the removed record.
    ///
    /// # Errors
    /// Returns an error if the task is missing or persistence fails.
    pub fn delete(&mut self, kind: TaskKind, id: TaskId, now: OffsetDateTime) -> CommandResult<Task> {
        let removed: Task = match kind {
            TaskKind::Ppm => remove(self.repo.ppm_mut(), id)?.into(),
            TaskKind::Cm => remove(self.repo.cm_mut(), id)?.into(),
        };
        self.persist(now)?;
        info!(%kind, %id, "deleted task");
        Ok(removed)
    }

    /// Append a photo to a task.
    ///
    /// Returns the new photo count.
    ///
    /// # Errors
    /// Returns an error if the task is missing or persistence fails.
    pub fn add_photo(
        &mut self,
        kind: TaskKind,
        id: TaskId,
        photo: Photo,
        now: OffsetDateTime,
    ) -> CommandResult<usize> {
        let count = match kind {
            TaskKind::Ppm => push_photo(find_mut(self.repo.ppm_mut(), id)?, photo, now),
            TaskKind::Cm => push_photo(find_mut(self.repo.cm_mut(), id)?, photo, now),
        };
        self.persist(now)?;
        Ok(count)
    }

    /// Remove the photo at `index`, keeping the order of the others.
    ///
    /// # Errors
    /// Returns an error if the task is missing, the index is out of range or
    /// persistence fails.
    pub fn remove_photo(
        &mut self,
        kind: TaskKind,
        id: TaskId,
        index: usize,
        now: OffsetDateTime,
    ) -> CommandResult<Photo> {
        let removed = match kind {
            TaskKind::Ppm => take_photo(find_mut(self.repo.ppm_mut(), id)?, index, now)?,
            TaskKind::Cm => take_photo(find_mut(self.repo.cm_mut(), id)?, index, now)?,
        };
        self.persist(now)?;
        Ok(removed)
    }

    /// Drop stored records with invalid dates.
    ///
    /// # Errors
    /// Returns an error if the stores cannot be read or written.
    pub fn clean(&mut self, now: OffsetDateTime) -> CommandResult<CleanReport> {
        Ok(self.repo.clean_invalid_data(now)?)
    }

    fn persist(&mut self, now: OffsetDateTime) -> CommandResult<()> {
        self.repo.save(now)?;
        Ok(())
    }
}

fn complete_if_requested(task: &mut PpmTask, now: OffsetDateTime) -> Option<Completion> {
    (task.status == PpmStatus::Completed).then(|| task.record_completion(now))
}

fn find_mut<T: TrackedTask>(tasks: &mut [T], id: TaskId) -> CommandResult<&mut T> {
    tasks
        .iter_mut()
        .find(|task| task.id() == id)
        .ok_or(TaskCommandError::NotFound { kind: T::KIND, id })
}

fn remove<T: TrackedTask>(tasks: &mut Vec<T>, id: TaskId) -> CommandResult<T> {
    let position = tasks
        .iter()
        .position(|task| task.id() == id)
        .ok_or(TaskCommandError::NotFound { kind: T::KIND, id })?;
    Ok(tasks.remove(position))
}

fn push_photo<T: TrackedTask>(task: &mut T, photo: Photo, now: OffsetDateTime) -> usize {
    task.photos_mut().push(photo);
    task.touch(now);
    task.photos().len()
}

fn take_photo<T: TrackedTask>(task: &mut T, index: usize, now: OffsetDateTime) -> CommandResult<Photo> {
    let len = task.photos().len();
    if index >= len {
        return Err(TaskCommandError::PhotoIndex {
            id: task.id(),
            index,
            len,
        });
    }
    let photo = task.photos_mut().remove(index);
    task.touch(now);
    Ok(photo)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required(field: &'static str, value: &str) -> CommandResult<String> {
    non_blank(Some(value))
        .map(str::to_owned)
        .ok_or(TaskCommandError::Required { field })
}

fn invalid(field: &'static str, value: &str) -> TaskCommandError {
    TaskCommandError::InvalidValue {
        field,
        value: value.to_owned(),
    }
}

fn parse_label<T>(field: &'static str, value: Option<&str>) -> CommandResult<T>
where
    T: std::str::FromStr + Default,
{
    non_blank(value).map_or_else(
        || Ok(T::default()),
        |raw| raw.parse().map_err(|_| invalid(field, raw)),
    )
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sync_guard::SyncGuard;
    use airfield_store::{Collection, CollectionStore, LocalStore, StoredRecord};
    use tempfile::TempDir;
    use time::macros::{date, datetime};

    fn service() -> (TempDir, TaskService) {
        let dir = TempDir::new().expect("create temp dir");
        let repo = TaskRepository::new(None, Arc::new(LocalStore::new(dir.path())), SyncGuard::default());
        (dir, TaskService::new(repo, TrackerConfig::default()))
    }

    fn ppm_input(due: &str) -> PpmInput {
        PpmInput {
            shift_type: "Day".into(),
            description: "Inspect approach lights".into(),
            task_type: "AGL".into(),
            due_date: due.into(),
            frequency: Some("Weekly".into()),
            ..PpmInput::default()
        }
    }

    fn cm_input() -> CmInput {
        CmInput {
            work_order: "WO-1".into(),
            description: "Taxiway light out".into(),
            date_reported: "2025-01-05".into(),
            priority: Some("High".into()),
            ..CmInput::default()
        }
    }

    #[test]
    fn create_inserts_at_front_and_persists() {
        let (dir, mut svc) = service();
        let now = datetime!(2025-01-01 08:00 UTC);
        let first = svc.create_ppm(ppm_input("2025-01-10"), now).expect("create");
        let second = svc.create_ppm(ppm_input("2025-01-11"), now).expect("create");
        assert!(first.id < second.id);
        assert!(first.id >= TaskId(now.unix_timestamp() * 1000));
        assert_eq!(svc.ppm()[0].id, second.id);
        assert_eq!(svc.ppm()[0].status, PpmStatus::NotStarted);
        assert_eq!(svc.ppm()[0].created_at, Some(now));
        let stored = LocalStore::new(dir.path()).load(Collection::Ppm).expect("backup");
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn invalid_date_leaves_state_untouched() {
        let (_dir, mut svc) = service();
        let err = svc
            .create_ppm(ppm_input("2025-02-30"), datetime!(2025-01-01 08:00 UTC))
            .expect_err("invalid date");
        assert_eq!(err.to_string(), "Please enter a valid due date");
        assert!(svc.ppm().is_empty());
    }

    #[test]
    fn submitting_completed_reschedules_recurring_task() {
        let (_dir, mut svc) = service();
        let now = datetime!(2025-01-01 08:00 UTC);
        let saved = svc.create_ppm(ppm_input("2025-01-01"), now).expect("create");
        let mut edit = ppm_input("2025-01-01");
        edit.status = Some("Completed".into());
        let later = datetime!(2025-01-01 17:00 UTC);
        let updated = svc.update_ppm(saved.id, edit, later).expect("update");
        assert_eq!(updated.completion, Some(Completion::Rescheduled(date!(2025 - 01 - 08))));
        let task = &svc.ppm()[0];
        assert_eq!(task.status, PpmStatus::NotStarted);
        assert_eq!(task.last_completed, Some(later));
        assert_eq!(task.created_at, Some(now));
        assert_eq!(svc.history(10).len(), 1);
    }

    #[test]
    fn complete_without_frequency_finishes() {
        let (_dir, mut svc) = service();
        let now = datetime!(2025-01-01 08:00 UTC);
        let mut input = ppm_input("2025-01-01");
        input.frequency = None;
        let saved = svc.create_ppm(input, now).expect("create");
        assert_eq!(svc.complete_ppm(saved.id, now).expect("complete"), Completion::Finished);
        assert_eq!(svc.ppm()[0].status, PpmStatus::Completed);
    }

    #[test]
    fn cm_edit_keeps_creation_and_photos() {
        let (_dir, mut svc) = service();
        let now = datetime!(2025-01-05 08:00 UTC);
        let id = svc.create_cm(cm_input(), now).expect("create");
        svc.add_photo(TaskKind::Cm, id, Photo::new("a.png", "data:image/png;base64,AA==", now), now)
            .expect("photo");
        let mut edit = cm_input();
        edit.status = Some("Pending Parts".into());
        let later = datetime!(2025-01-06 08:00 UTC);
        svc.update_cm(id, edit, later).expect("update");
        let task = &svc.cm()[0];
        assert_eq!(task.status, CmStatus::PendingParts);
        assert_eq!(task.priority, CmPriority::High);
        assert_eq!(task.created_date, Some(now));
        assert_eq!(task.last_modified, Some(later));
        assert_eq!(task.photos.len(), 1);
    }

    #[test]
    fn photo_removal_preserves_order() {
        let (_dir, mut svc) = service();
        let now = datetime!(2025-01-01 08:00 UTC);
        let saved = svc.create_ppm(ppm_input("2025-01-10"), now).expect("create");
        for name in ["a", "b", "c"] {
            svc.add_photo(TaskKind::Ppm, saved.id, Photo::new(name, "data:,", now), now)
                .expect("photo");
        }
        let removed = svc.remove_photo(TaskKind::Ppm, saved.id, 1, now).expect("remove");
        assert_eq!(removed.name, "b");
        let names: Vec<&str> = svc.ppm()[0].photos.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(matches!(
            svc.remove_photo(TaskKind::Ppm, saved.id, 5, now),
            Err(TaskCommandError::PhotoIndex { len: 2, .. })
        ));
    }

    #[test]
    fn list_order_survives_reload() {
        let (dir, mut svc) = service();
        let now = datetime!(2025-01-01 08:00 UTC);
        for description in ["first", "second", "third"] {
            let input = PpmInput {
                description: description.into(),
                ..ppm_input("2025-01-10")
            };
            svc.create_ppm(input, now).expect("create");
        }
        let descriptions = |svc: &TaskService| -> Vec<String> {
            svc.ppm().iter().map(|task| task.description.clone()).collect()
        };
        assert_eq!(descriptions(&svc), vec!["third", "second", "first"]);

        let repo = TaskRepository::new(None, Arc::new(LocalStore::new(dir.path())), SyncGuard::default());
        let mut reopened = TaskService::new(repo, TrackerConfig::default());
        reopened.start().expect("reload");
        assert_eq!(descriptions(&reopened), vec!["third", "second", "first"]);
    }

    #[test]
    fn records_with_unknown_labels_survive_unrelated_saves() {
        let (dir, mut svc) = service();
        let backup = LocalStore::new(dir.path());
        backup
            .save(
                Collection::Ppm,
                &[StoredRecord {
                    id: TaskId(1),
                    body: serde_json::json!({"id": 1, "dueDate": "2025-01-01", "status": "Pending"}),
                }],
            )
            .expect("seed ppm");
        backup
            .save(
                Collection::Cm,
                &[StoredRecord {
                    id: TaskId(2),
                    body: serde_json::json!({"id": 2, "dateReported": "2025-01-01", "priority": "Urgent"}),
                }],
            )
            .expect("seed cm");

        let report = svc.start().expect("start");
        assert!(report.dropped.is_empty());
        assert_eq!(svc.ppm()[0].status, PpmStatus::NotStarted);
        assert_eq!(svc.cm()[0].priority, CmPriority::Medium);

        svc.create_ppm(ppm_input("2025-01-10"), datetime!(2025-01-02 08:00 UTC))
            .expect("create");
        assert_eq!(backup.load(Collection::Ppm).expect("ppm backup").len(), 2);
        assert_eq!(backup.load(Collection::Cm).expect("cm backup").len(), 1);
    }

    #[test]
    fn delete_returns_removed_task() {
        let (_dir, mut svc) = service();
        let now = datetime!(2025-01-01 08:00 UTC);
        let id = svc.create_cm(cm_input(), now).expect("create");
        let removed = svc.delete(TaskKind::Cm, id, now).expect("delete");
        assert_eq!(removed.kind(), TaskKind::Cm);
        assert_eq!(removed.id(), id);
        assert_eq!(removed.description(), "Taxiway light out");
        assert!(svc.cm().is_empty());
    }

    #[test]
    fn delete_unknown_task_is_not_found() {
        let (_dir, mut svc) = service();
        let err = svc
            .delete(TaskKind::Cm, TaskId(42), datetime!(2025-01-01 08:00 UTC))
            .expect_err("missing");
        assert!(matches!(err, TaskCommandError::NotFound { kind: TaskKind::Cm, .. }));
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let (_dir, mut svc) = service();
        let mut input = cm_input();
        input.status = Some("Snoozed".into());
        assert!(matches!(
            svc.create_cm(input, datetime!(2025-01-01 08:00 UTC)),
            Err(TaskCommandError::InvalidValue { field: "status", .. })
        ));
        assert!(svc.cm().is_empty());
    }
}
