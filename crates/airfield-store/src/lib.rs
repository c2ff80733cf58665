//! Persistence backends for the airfield tracker collections.

/// Error types for store operations.
pub mod error;
/// JSON-file backup store.
pub mod local;
/// In-process realtime store with change fan-out.
pub mod realtime;

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use airfield_core::id::TaskId;
use airfield_core::task::TaskKind;
use serde_json::{Map, Value};

pub use error::StoreError;
pub use local::LocalStore;
pub use realtime::RealtimeStore;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A task record as held by a store, before it is decoded into a task.
pub type RawTask = Value;

/// Named task collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Preventive maintenance tasks.
    Ppm,
    /// Corrective maintenance tasks.
    Cm,
}

impl Collection {
    /// Both collections.
    pub const ALL: [Self; 2] = [Self::Ppm, Self::Cm];

    /// Remote collection key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Ppm => "ppmTasks",
            Self::Cm => "cmTasks",
        }
    }

    /// Local backup key.
    #[must_use]
    pub const fn backup_key(self) -> &'static str {
        match self {
            Self::Ppm => "agl_ppm_tasks",
            Self::Cm => "agl_cm_tasks",
        }
    }

    /// Kind of task stored in the collection.
    #[must_use]
    pub const fn kind(self) -> TaskKind {
        match self {
            Self::Ppm => TaskKind::Ppm,
            Self::Cm => TaskKind::Cm,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl From<TaskKind> for Collection {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Ppm => Self::Ppm,
            TaskKind::Cm => Self::Cm,
        }
    }
}

/// Encoded task ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Task identifier; the map key in the stored collection.
    pub id: TaskId,
    /// Encoded record.
    pub body: Value,
}

/// Callback invoked with the full collection after a change.
pub type ChangeCallback = Arc<dyn Fn(Collection, &[RawTask]) + Send + Sync>;

/// Keeps a subscription alive; dropping it unsubscribes.
#[must_use = "dropping the handle cancels the subscription"]
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    /// Handle for a subscription that never fires.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Handle that runs `cancel` when dropped.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Whether the handle is bound to a live subscription.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Storage for the task collections.
pub trait CollectionStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Load every record of a collection.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read.
    fn load(&self, collection: Collection) -> StoreResult<Vec<RawTask>>;

    /// Replace a collection with `records`.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be written.
    fn save(&self, collection: Collection, records: &[StoredRecord]) -> StoreResult<()>;

    /// Register for remote changes to a collection.
    ///
    /// # Errors
    /// Returns an error when the backend cannot accept subscriptions.
    fn subscribe(
        &self,
        collection: Collection,
        callback: ChangeCallback,
    ) -> StoreResult<SubscriptionHandle>;
}

/// Build the stored map representation keyed by task id.
#[must_use]
pub fn records_to_map(records: &[StoredRecord]) -> Map<String, Value> {
    records
        .iter()
        .map(|record| (record.id.storage_key(), record.body.clone()))
        .collect()
}

/// Records of a keyed collection, newest id first.
///
/// Lists keep new tasks at the front and ids grow with creation time, so this
/// restores list order for maps that do not keep insertion order.
#[must_use]
pub fn records_from_map(map: &Map<String, Value>) -> Vec<RawTask> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by_key(|(key, _)| Reverse(key.parse::<i64>().ok()));
    entries.into_iter().map(|(_, record)| record.clone()).collect()
}

/// Flatten a stored collection into its records.
///
/// Arrays keep their order; keyed maps come back newest first.
///
/// # Errors
/// Returns [`StoreError::Shape`] for any other JSON value.
pub fn records_from_value(collection: Collection, value: Value) -> StoreResult<Vec<RawTask>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(map) => Ok(records_from_map(&map)),
        _ => Err(StoreError::Shape { collection }),
    }
}
