//! Owned in-memory task collections mirrored to a remote and a backup store.

use std::sync::Arc;

use airfield_core::task::{CmTask, PpmTask, RejectedRecord, TrackedTask, decode_records};
use airfield_store::{
    ChangeCallback, Collection, CollectionStore, RawTask, StoredRecord, SubscriptionHandle,
};
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::sync_guard::SyncGuard;

/// User-facing notification raised by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The remote store failed; data is kept in the local backup only.
    FallbackActivated {
        /// Failure that triggered the fallback.
        reason: String,
    },
    /// A remote save succeeded again after a fallback.
    SyncRestored,
}

/// Where the last save landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to the remote store and the backup.
    Synced,
    /// Written to the backup only.
    LocalOnly,
}

/// Summary of a load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Store the data came from.
    pub source: &'static str,
    /// PPM tasks loaded.
    pub ppm: usize,
    /// CM tasks loaded.
    pub cm: usize,
    /// Records dropped because they failed validation.
    pub dropped: Vec<(Collection, RejectedRecord)>,
}

/// Summary of [`TaskRepository::clean_invalid_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// PPM records removed.
    pub removed_ppm: usize,
    /// CM records removed.
    pub removed_cm: usize,
}

impl CleanReport {
    /// Total records removed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.removed_ppm + self.removed_cm
    }
}

/// Outcome of draining queued remote updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemotePoll {
    /// Updates applied to the local collections.
    pub applied: usize,
    /// Updates dropped as echoes of a local save.
    pub suppressed: usize,
}

struct RemoteUpdate {
    collection: Collection,
    records: Vec<RawTask>,
}

/// Owns the PPM and CM collections for one client.
pub struct TaskRepository {
    remote: Option<Arc<dyn CollectionStore>>,
    backup: Arc<dyn CollectionStore>,
    guard: SyncGuard,
    ppm: Vec<PpmTask>,
    cm: Vec<CmTask>,
    fallback: bool,
    notices: Vec<Notice>,
    inbox_tx: UnboundedSender<RemoteUpdate>,
    inbox_rx: UnboundedReceiver<RemoteUpdate>,
    subscriptions: Vec<SubscriptionHandle>,
}

impl TaskRepository {
    /// Repository syncing to `remote` (when present) and always backing up to `backup`.
    pub fn new(
        remote: Option<Arc<dyn CollectionStore>>,
        backup: Arc<dyn CollectionStore>,
        guard: SyncGuard,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            remote,
            backup,
            guard,
            ppm: Vec::new(),
            cm: Vec::new(),
            fallback: false,
            notices: Vec::new(),
            inbox_tx,
            inbox_rx,
            subscriptions: Vec::new(),
        }
    }

    /// PPM tasks in display order.
    #[must_use]
    pub fn ppm(&self) -> &[PpmTask] {
        &self.ppm
    }

    /// CM tasks in display order.
    #[must_use]
    pub fn cm(&self) -> &[CmTask] {
        &self.cm
    }

    pub(crate) const fn ppm_mut(&mut self) -> &mut Vec<PpmTask> {
        &mut self.ppm
    }

    pub(crate) const fn cm_mut(&mut self) -> &mut Vec<CmTask> {
        &mut self.cm
    }

    /// Whether the repository is running on the backup store only.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Echo suppression state.
    #[must_use]
    pub const fn sync_guard(&self) -> &SyncGuard {
        &self.guard
    }

    /// Drain pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Replace the in-memory collections with the stored ones.
    ///
    /// Reads the remote store when available and falls back to the backup on
    /// failure. Records that fail validation are dropped and reported.
    ///
    /// # Errors
    /// Returns an error if the backup store cannot be read either.
    pub fn load(&mut self) -> Result<LoadReport> {
        let (source, ppm_raw, cm_raw) = self.read_collections()?;
        let mut report = LoadReport {
            source,
            ..LoadReport::default()
        };
        let (ppm, rejected) = decode::<PpmTask>(Collection::Ppm, ppm_raw);
        report.dropped.extend(rejected.into_iter().map(|r| (Collection::Ppm, r)));
        let (cm, rejected) = decode::<CmTask>(Collection::Cm, cm_raw);
        report.dropped.extend(rejected.into_iter().map(|r| (Collection::Cm, r)));
        report.ppm = ppm.len();
        report.cm = cm.len();
        self.ppm = ppm;
        self.cm = cm;
        debug!(source, ppm = report.ppm, cm = report.cm, dropped = report.dropped.len(), "loaded collections");
        Ok(report)
    }

    /// Subscribe to remote changes of both collections.
    ///
    /// Returns `false` when there is no remote store or subscribing failed; in
    /// the latter case the repository switches to fallback mode.
    pub fn connect(&mut self) -> bool {
        let Some(remote) = self.remote.clone() else {
            return false;
        };
        if !self.subscriptions.is_empty() {
            return true;
        }
        let mut handles = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let tx = self.inbox_tx.clone();
            let callback: ChangeCallback = Arc::new(move |collection: Collection, records: &[RawTask]| {
                // Fails only once the repository has been dropped.
                let _ = tx.send(RemoteUpdate {
                    collection,
                    records: records.to_vec(),
                });
            });
            match remote.subscribe(collection, callback) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    self.activate_fallback(&err.to_string());
                    return false;
                }
            }
        }
        self.subscriptions = handles;
        info!(store = remote.name(), "subscribed to remote changes");
        true
    }

    /// Apply queued remote updates, dropping those that echo a recent save.
    pub fn poll_remote(&mut self, now: OffsetDateTime) -> RemotePoll {
        let mut poll = RemotePoll::default();
        while let Ok(update) = self.inbox_rx.try_recv() {
            if self.apply_remote(update.collection, update.records, now) {
                poll.applied += 1;
            } else {
                poll.suppressed += 1;
            }
        }
        poll
    }

    /// Apply one remote snapshot of a collection unless it is suppressed.
    ///
    /// Returns whether the update was applied.
    pub fn apply_remote(
        &mut self,
        collection: Collection,
        records: Vec<RawTask>,
        now: OffsetDateTime,
    ) -> bool {
        if self.guard.is_suppressed(now) {
            debug!(%collection, "skipping remote update during sync cool-down");
            return false;
        }
        match collection {
            Collection::Ppm => self.ppm = decode(collection, records).0,
            Collection::Cm => self.cm = decode(collection, records).0,
        }
        debug!(%collection, "applied remote update");
        true
    }

    /// Persist both collections.
    ///
    /// Tries the remote store first and always writes the backup. A remote
    /// failure switches to fallback mode; the next successful remote save
    /// leaves it again.
    ///
    /// # Errors
    /// Returns an error if encoding fails or the backup cannot be written.
    pub fn save(&mut self, now: OffsetDateTime) -> Result<SaveOutcome> {
        let ppm = encode(&self.ppm)?;
        let cm = encode(&self.cm)?;

        let outcome = match self.remote.clone() {
            Some(remote) => {
                self.guard.arm(now);
                match remote
                    .save(Collection::Ppm, &ppm)
                    .and_then(|()| remote.save(Collection::Cm, &cm))
                {
                    Ok(()) => {
                        if self.fallback {
                            self.fallback = false;
                            self.notices.push(Notice::SyncRestored);
                            info!(store = remote.name(), "remote sync restored");
                        }
                        SaveOutcome::Synced
                    }
                    Err(err) => {
                        self.guard.disarm();
                        self.activate_fallback(&err.to_string());
                        SaveOutcome::LocalOnly
                    }
                }
            }
            None => SaveOutcome::LocalOnly,
        };

        self.backup
            .save(Collection::Ppm, &ppm)
            .context("failed to back up PPM tasks")?;
        self.backup
            .save(Collection::Cm, &cm)
            .context("failed to back up CM tasks")?;
        info!(ppm = ppm.len(), cm = cm.len(), ?outcome, "saved collections");
        Ok(outcome)
    }

    /// Re-read the stored collections, drop records with invalid dates and
    /// persist the remainder.
    ///
    /// # Errors
    /// Returns an error if reading or saving fails.
    pub fn clean_invalid_data(&mut self, now: OffsetDateTime) -> Result<CleanReport> {
        let report = self.load()?;
        let clean = report
            .dropped
            .iter()
            .fold(CleanReport::default(), |mut clean, (collection, _)| {
                match collection {
                    Collection::Ppm => clean.removed_ppm += 1,
                    Collection::Cm => clean.removed_cm += 1,
                }
                clean
            });
        if clean.total() > 0 {
            self.save(now)?;
            info!(removed = clean.total(), "removed invalid records");
        }
        Ok(clean)
    }

    fn read_collections(&mut self) -> Result<(&'static str, Vec<RawTask>, Vec<RawTask>)> {
        if let Some(remote) = self.remote.clone() {
            let loaded = remote
                .load(Collection::Ppm)
                .and_then(|ppm| remote.load(Collection::Cm).map(|cm| (ppm, cm)));
            match loaded {
                Ok((ppm, cm)) => return Ok((remote.name(), ppm, cm)),
                Err(err) => self.activate_fallback(&err.to_string()),
            }
        }
        let ppm = self
            .backup
            .load(Collection::Ppm)
            .context("failed to read PPM backup")?;
        let cm = self
            .backup
            .load(Collection::Cm)
            .context("failed to read CM backup")?;
        Ok((self.backup.name(), ppm, cm))
    }

    fn activate_fallback(&mut self, reason: &str) {
        if self.fallback {
            debug!(reason, "remote store still unavailable");
            return;
        }
        warn!(reason, "remote store unavailable; using local backup");
        self.fallback = true;
        self.notices.push(Notice::FallbackActivated {
            reason: reason.to_owned(),
        });
    }
}

fn decode<T: DeserializeOwned>(
    collection: Collection,
    records: Vec<RawTask>,
) -> (Vec<T>, Vec<RejectedRecord>) {
    let (tasks, rejected) = decode_records::<T>(records);
    for record in &rejected {
        warn!(
            %collection,
            id = ?record.id,
            reason = %record.reason,
            "dropping invalid task record"
        );
    }
    (tasks, rejected)
}

fn encode<T: Serialize + TrackedTask>(tasks: &[T]) -> Result<Vec<StoredRecord>> {
    tasks
        .iter()
        .map(|task| {
            let body = serde_json::to_value(task)
                .with_context(|| format!("failed to encode {} task {}", T::KIND, task.id()))?;
            Ok(StoredRecord { id: task.id(), body })
        })
        .collect()
}
