//! Suppression of remote echoes that follow a local save.
//!
//! A realtime store notifies every subscriber after a write, including the
//! client that wrote. The guard records each local save as a
//! [`PendingWrite`] that stays live for a cool-down period; remote updates
//! arriving while it is live are treated as echoes and dropped.
//!
//! Known race: the token does not know who sent an update. A change from
//! another client that lands inside the cool-down is dropped as well and only
//! becomes visible with the next remote push. A second local save inside the
//! window re-arms it from the later save.

use time::{Duration, OffsetDateTime};
use tracing::debug;

/// Token for a local save whose echo may still arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    /// When the save happened.
    pub armed_at: OffsetDateTime,
    /// When remote updates are accepted again.
    pub expires_at: OffsetDateTime,
}

impl PendingWrite {
    /// Whether the token still suppresses updates at `now`.
    #[must_use]
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Holds at most one [`PendingWrite`].
#[derive(Debug, Clone)]
pub struct SyncGuard {
    cooldown: Duration,
    pending: Option<PendingWrite>,
}

impl SyncGuard {
    /// Guard with the given cool-down.
    #[must_use]
    pub const fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            pending: None,
        }
    }

    /// Configured cool-down.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record a local save at `now`, replacing any earlier token.
    pub fn arm(&mut self, now: OffsetDateTime) -> PendingWrite {
        let token = PendingWrite {
            armed_at: now,
            expires_at: now.checked_add(self.cooldown).unwrap_or(now),
        };
        self.pending = Some(token);
        token
    }

    /// Drop the token, e.g. after a failed save that will never echo.
    pub fn disarm(&mut self) {
        self.pending = None;
    }

    /// Whether a remote update arriving at `now` must be ignored.
    ///
    /// Expired tokens are cleared as a side effect.
    pub fn is_suppressed(&mut self, now: OffsetDateTime) -> bool {
        match self.pending {
            Some(token) if token.is_live(now) => true,
            Some(token) => {
                debug!(armed_at = %token.armed_at, "sync cool-down elapsed");
                self.pending = None;
                false
            }
            None => false,
        }
    }

    /// Current token, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<PendingWrite> {
        self.pending
    }
}

impl Default for SyncGuard {
    fn default() -> Self {
        Self::new(Duration::milliseconds(1000))
    }
}
