use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;

static LAST_ISSUED: AtomicI64 = AtomicI64::new(0);

/// Identifier of a task: creation time in Unix milliseconds.
///
/// PPM and CM collections use independent id namespaces.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    #[must_use]
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self::issue_after(OffsetDateTime::now_utc())
    }

    /// Generate an identifier for the given creation instant.
    ///
    /// Ids are strictly increasing within the process even when several tasks
    /// are created in the same millisecond.
    #[must_use]
    pub fn issue_after(created: OffsetDateTime) -> Self {
        let millis = i64::try_from(created.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);
        let mut last = LAST_ISSUED.load(Ordering::Relaxed);
        loop {
            let next = millis.max(last.saturating_add(1));
            match LAST_ISSUED.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return Self(next),
                Err(actual) => last = actual,
            }
        }
    }

    /// Key under which the record is stored in a collection map.
    #[must_use]
    pub fn storage_key(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}
