//! PPM and CM task records.
//!
//! Records are serialized with the camelCase keys used by the shared
//! datastore so both the remote collection and the local backup stay
//! readable by older clients.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use time::{Date, OffsetDateTime};

use crate::date;
use crate::id::TaskId;
use crate::recurrence::{self, Frequency};
use crate::status::{CmPriority, CmStatus, PpmStatus};

/// Which collection a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// Planned preventive maintenance.
    Ppm,
    /// Corrective maintenance.
    Cm,
}

impl TaskKind {
    /// Short label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ppm => "PPM",
            Self::Cm => "CM",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image attached to a task, stored inline as a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Original file name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Inline `data:image/...;base64,...` payload.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: String,
    /// Upload instant.
    #[serde(default, with = "date::timestamp")]
    pub timestamp: Option<OffsetDateTime>,
}

impl Photo {
    /// Attach a photo uploaded at `timestamp`.
    pub fn new(name: impl Into<String>, data: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            timestamp: Some(timestamp),
        }
    }
}

/// Recurring preventive maintenance task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PpmTask {
    /// Identifier.
    pub id: TaskId,
    /// Shift pattern the task belongs to (e.g. "Day", "Night").
    #[serde(default, deserialize_with = "null_as_default")]
    pub shift_type: String,
    /// Free text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Equipment / task category.
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub task_type: String,
    /// Next due date.
    #[serde(with = "date::iso")]
    pub due_date: Date,
    /// Recurrence tag.
    #[serde(default, with = "recurrence::optional")]
    pub frequency: Option<Frequency>,
    /// Manual status.
    #[serde(default)]
    pub status: PpmStatus,
    /// Day-shift assignee.
    #[serde(default, deserialize_with = "null_as_default")]
    pub day_shift: String,
    /// Night-shift assignee.
    #[serde(default, deserialize_with = "null_as_default")]
    pub night_shift: String,
    /// Attachments in upload order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub photos: Vec<Photo>,
    /// Most recent completion.
    #[serde(default, with = "date::timestamp")]
    pub last_completed: Option<OffsetDateTime>,
    /// Creation instant.
    #[serde(default, with = "date::timestamp")]
    pub created_at: Option<OffsetDateTime>,
    /// Last modification instant.
    #[serde(default, with = "date::timestamp")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Result of recording a PPM completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The task recurs; it was moved to a new due date and reset.
    Rescheduled(Date),
    /// The task has no frequency and stays completed.
    Finished,
}

impl PpmTask {
    /// Blank not-started task due on `due_date`.
    #[must_use]
    pub fn new(due_date: Date) -> Self {
        Self::with_id(TaskId::new(), due_date)
    }

    /// Blank not-started task with a known id.
    #[must_use]
    pub const fn with_id(id: TaskId, due_date: Date) -> Self {
        Self {
            id,
            shift_type: String::new(),
            description: String::new(),
            task_type: String::new(),
            due_date,
            frequency: None,
            status: PpmStatus::NotStarted,
            day_shift: String::new(),
            night_shift: String::new(),
            photos: Vec::new(),
            last_completed: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Record a completion at `now`.
    ///
    /// Completion is a recurrence event: with a frequency the due date moves
    /// forward and the status returns to Not Started.
    pub fn record_completion(&mut self, now: OffsetDateTime) -> Completion {
        self.last_completed = Some(now);
        self.updated_at = Some(now);
        match self.frequency {
            Some(frequency) => {
                self.due_date = recurrence::next_due_date(self.due_date, frequency);
                self.status = PpmStatus::NotStarted;
                Completion::Rescheduled(self.due_date)
            }
            None => {
                self.status = PpmStatus::Completed;
                Completion::Finished
            }
        }
    }
}

/// Corrective maintenance task raised against a work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmTask {
    /// Identifier.
    pub id: TaskId,
    /// Work order reference.
    #[serde(default, deserialize_with = "null_as_default")]
    pub work_order: String,
    /// Free text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Who raised the fault.
    #[serde(default, deserialize_with = "null_as_default")]
    pub reported_by: String,
    /// Day the fault was reported.
    #[serde(with = "date::iso")]
    pub date_reported: Date,
    /// Manual status.
    #[serde(default)]
    pub status: CmStatus,
    /// Responsible technician.
    #[serde(default, deserialize_with = "null_as_default")]
    pub assigned_to: String,
    /// Urgency.
    #[serde(default)]
    pub priority: CmPriority,
    /// Where on the airfield.
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    /// Attachments in upload order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub photos: Vec<Photo>,
    /// Creation instant.
    #[serde(default, with = "date::timestamp")]
    pub created_date: Option<OffsetDateTime>,
    /// Last edit through the form.
    #[serde(default, with = "date::timestamp")]
    pub last_modified: Option<OffsetDateTime>,
    /// Last modification instant.
    #[serde(default, with = "date::timestamp")]
    pub updated_at: Option<OffsetDateTime>,
}

impl CmTask {
    /// Blank open task reported on `date_reported`.
    #[must_use]
    pub fn new(date_reported: Date) -> Self {
        Self::with_id(TaskId::new(), date_reported)
    }

    /// Blank open task with a known id.
    #[must_use]
    pub const fn with_id(id: TaskId, date_reported: Date) -> Self {
        Self {
            id,
            work_order: String::new(),
            description: String::new(),
            reported_by: String::new(),
            date_reported,
            status: CmStatus::Open,
            assigned_to: String::new(),
            priority: CmPriority::Medium,
            location: String::new(),
            photos: Vec::new(),
            created_date: None,
            last_modified: None,
            updated_at: None,
        }
    }
}

/// Field addressable by a categorical filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryField {
    /// PPM shift type.
    ShiftType,
    /// PPM task type.
    TaskType,
    /// Manual status (either kind).
    Status,
    /// PPM frequency.
    Frequency,
    /// CM priority.
    Priority,
    /// CM location.
    Location,
    /// CM assignee.
    AssignedTo,
}

/// Behaviour shared by PPM and CM records.
pub trait TrackedTask {
    /// Collection the record lives in.
    const KIND: TaskKind;

    /// Identifier.
    fn id(&self) -> TaskId;

    /// Free text.
    fn description(&self) -> &str;

    /// Attachments in upload order.
    fn photos(&self) -> &[Photo];

    /// Mutable attachments.
    fn photos_mut(&mut self) -> &mut Vec<Photo>;

    /// Calendar date used by date-range windows (due date or report date).
    fn schedule_date(&self) -> Date;

    /// Last modification instant, if recorded.
    fn updated_at(&self) -> Option<OffsetDateTime>;

    /// Stamp a modification.
    fn touch(&mut self, now: OffsetDateTime);

    /// Fields searched by free-text queries.
    fn search_fields(&self) -> Vec<&str>;

    /// Value of a categorical field; `None` when the field does not apply.
    fn category(&self, field: CategoryField) -> Option<&str>;
}

impl TrackedTask for PpmTask {
    const KIND: TaskKind = TaskKind::Ppm;

    fn id(&self) -> TaskId {
        self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn photos(&self) -> &[Photo] {
        &self.photos
    }

    fn photos_mut(&mut self) -> &mut Vec<Photo> {
        &mut self.photos
    }

    fn schedule_date(&self) -> Date {
        self.due_date
    }

    fn updated_at(&self) -> Option<OffsetDateTime> {
        self.updated_at
    }

    fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = Some(now);
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.description, &self.task_type, self.status.as_str()]
    }

    fn category(&self, field: CategoryField) -> Option<&str> {
        match field {
            CategoryField::ShiftType => Some(&self.shift_type),
            CategoryField::TaskType => Some(&self.task_type),
            CategoryField::Status => Some(self.status.as_str()),
            CategoryField::Frequency => self.frequency.map(Frequency::as_str),
            CategoryField::Priority | CategoryField::Location | CategoryField::AssignedTo => None,
        }
    }
}

impl TrackedTask for CmTask {
    const KIND: TaskKind = TaskKind::Cm;

    fn id(&self) -> TaskId {
        self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn photos(&self) -> &[Photo] {
        &self.photos
    }

    fn photos_mut(&mut self) -> &mut Vec<Photo> {
        &mut self.photos
    }

    fn schedule_date(&self) -> Date {
        self.date_reported
    }

    fn updated_at(&self) -> Option<OffsetDateTime> {
        self.updated_at
    }

    fn touch(&mut self, now: OffsetDateTime) {
        self.last_modified = Some(now);
        self.updated_at = Some(now);
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            &self.work_order,
            &self.description,
            &self.location,
            &self.reported_by,
            &self.assigned_to,
        ]
    }

    fn category(&self, field: CategoryField) -> Option<&str> {
        match field {
            CategoryField::Status => Some(self.status.as_str()),
            CategoryField::Priority => Some(self.priority.as_str()),
            CategoryField::Location => Some(&self.location),
            CategoryField::AssignedTo => Some(&self.assigned_to),
            CategoryField::ShiftType | CategoryField::TaskType | CategoryField::Frequency => None,
        }
    }
}

/// A task of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Preventive.
    Ppm(PpmTask),
    /// Corrective.
    Cm(CmTask),
}

impl Task {
    /// Collection the task belongs to.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        match self {
            Self::Ppm(_) => TaskKind::Ppm,
            Self::Cm(_) => TaskKind::Cm,
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        match self {
            Self::Ppm(task) => task.id,
            Self::Cm(task) => task.id,
        }
    }

    /// Free text.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Ppm(task) => &task.description,
            Self::Cm(task) => &task.description,
        }
    }
}

impl From<PpmTask> for Task {
    fn from(task: PpmTask) -> Self {
        Self::Ppm(task)
    }
}

impl From<CmTask> for Task {
    fn from(task: CmTask) -> Self {
        Self::Cm(task)
    }
}

/// A stored record that could not be decoded into a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Identifier, when the record carried a numeric one.
    pub id: Option<TaskId>,
    /// Decoder message.
    pub reason: String,
}

/// Decode raw stored records, separating corrupt ones instead of failing.
///
/// Order of the accepted records follows the input.
pub fn decode_records<T>(records: Vec<Value>) -> (Vec<T>, Vec<RejectedRecord>)
where
    T: DeserializeOwned,
{
    let mut accepted = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for record in records {
        let id = record.get("id").and_then(Value::as_i64).map(TaskId);
        match serde_json::from_value::<T>(record) {
            Ok(task) => accepted.push(task),
            Err(err) => rejected.push(RejectedRecord {
                id,
                reason: err.to_string(),
            }),
        }
    }
    (accepted, rejected)
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::{date, datetime};

    #[test]
    fn decodes_legacy_ppm_record() {
        let raw = json!({
            "id": 1_735_689_600_000_i64,
            "shiftType": "Day",
            "description": "Inspect runway edge lights",
            "type": "AGL",
            "dueDate": "2025-01-01",
            "frequency": "Weekly",
            "status": "Not Started",
            "dayShift": "Ali",
            "nightShift": "",
            "photos": null,
            "lastCompleted": null,
            "createdAt": "2024-12-01T08:00:00.000Z",
            "updatedAt": "2024-12-02T08:00:00.000Z"
        });
        let task: PpmTask = serde_json::from_value(raw)
            .unwrap_or_else(|err| panic!("legacy record must decode: {err}"));
        assert_eq!(task.id, TaskId(1_735_689_600_000));
        assert_eq!(task.task_type, "AGL");
        assert_eq!(task.frequency, Some(Frequency::Weekly));
        assert!(task.photos.is_empty());
        assert_eq!(task.updated_at, Some(datetime!(2024-12-02 08:00 UTC)));
    }

    #[test]
    fn blank_frequency_and_status_use_defaults() {
        let raw = json!({"id": 1, "dueDate": "2025-01-01", "frequency": "", "status": ""});
        let task: PpmTask = serde_json::from_value(raw)
            .unwrap_or_else(|err| panic!("record must decode: {err}"));
        assert_eq!(task.frequency, None);
        assert_eq!(task.status, PpmStatus::NotStarted);
    }

    #[test]
    fn serializes_with_wire_keys() {
        let mut task = CmTask::new(date!(2025 - 02 - 03));
        task.work_order = "WO-17".into();
        task.status = CmStatus::PendingParts;
        let value = serde_json::to_value(&task)
            .unwrap_or_else(|err| panic!("record must encode: {err}"));
        assert_eq!(value["workOrder"], "WO-17");
        assert_eq!(value["dateReported"], "2025-02-03");
        assert_eq!(value["status"], "Pending Parts");
        assert_eq!(value["priority"], "Medium");
    }

    #[test]
    fn decode_records_separates_corrupt_entries() {
        let records = vec![
            json!({"id": 1, "dueDate": "2025-01-01"}),
            json!({"id": 2, "dueDate": "2025-02-30"}),
            json!({"id": 3}),
            json!({"id": 4, "dueDate": "2025-03-01"}),
            json!({"id": 5, "dueDate": "2025-03-01", "status": "Pending"}),
        ];
        let (tasks, rejected) = decode_records::<PpmTask>(records);
        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TaskId(1), TaskId(4), TaskId(5)]);
        assert_eq!(tasks[2].status, PpmStatus::NotStarted);
        let rejected_ids: Vec<Option<TaskId>> = rejected.iter().map(|r| r.id).collect();
        assert_eq!(rejected_ids, vec![Some(TaskId(2)), Some(TaskId(3))]);
    }

    #[test]
    fn with_id_keeps_the_given_identity() {
        let ppm = PpmTask::with_id(TaskId(1_735_689_600_000), date!(2025 - 01 - 01));
        assert_eq!(ppm.id, TaskId(1_735_689_600_000));
        assert_eq!(ppm.status, PpmStatus::NotStarted);
        let cm = CmTask::with_id(TaskId(7), date!(2025 - 01 - 02));
        assert_eq!(cm.id, TaskId(7));
        assert_eq!(cm.priority, CmPriority::Medium);
        assert_eq!(Task::from(cm).kind(), TaskKind::Cm);
    }

    #[test]
    fn weekly_completion_reschedules() {
        let mut task = PpmTask::new(date!(2025 - 01 - 01));
        task.frequency = Some(Frequency::Weekly);
        task.status = PpmStatus::InProgress;
        let now = datetime!(2025-01-01 10:00 UTC);
        assert_eq!(
            task.record_completion(now),
            Completion::Rescheduled(date!(2025 - 01 - 08))
        );
        assert_eq!(task.due_date, date!(2025 - 01 - 08));
        assert_eq!(task.status, PpmStatus::NotStarted);
        assert_eq!(task.last_completed, Some(now));
    }

    #[test]
    fn completion_without_frequency_stays_completed() {
        let mut task = PpmTask::new(date!(2025 - 01 - 01));
        let now = datetime!(2025-01-01 10:00 UTC);
        assert_eq!(task.record_completion(now), Completion::Finished);
        assert_eq!(task.status, PpmStatus::Completed);
        assert_eq!(task.due_date, date!(2025 - 01 - 01));
    }
}
