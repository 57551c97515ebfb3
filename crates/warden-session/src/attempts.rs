//! Attempt limiting and dead-state tracking.
//!
//! Two things live here because both are owned per identity, independent
//! of whether that identity currently has a session:
//!
//! - **Attempt counters**: failed authentication-related attempts. They
//!   decay by one on every decay tick and disappear at zero. They are NOT
//!   cleared on disconnect, otherwise reconnecting would reset the ban.
//! - **Dead flags**: set while an avatar is dead so the position loop
//!   doesn't drag a corpse away before the client shows the death screen.
//!   Each death stamps the flag with a fresh number, so a delayed clear
//!   scheduled for an earlier death can't lift a later one.

use std::collections::HashMap;

use parking_lot::Mutex;
use warden_protocol::IdentityKey;

/// Which trigger path produced a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptKind {
    /// A (re)connection, or a kick for never authenticating in time.
    Join,
    /// A wrong password at `login`.
    Login,
}

/// Per-identity failure counters with time-based decay, plus dead flags.
#[derive(Debug)]
pub struct AttemptTracker {
    max_attempts: u32,
    /// When `true`, both paths feed one counter per identity.
    shared: bool,
    counters: Mutex<HashMap<(IdentityKey, AttemptKind), u32>>,
    dead: Mutex<DeadFlags>,
}

#[derive(Debug, Default)]
struct DeadFlags {
    next_stamp: u64,
    flags: HashMap<IdentityKey, u64>,
}

impl AttemptTracker {
    /// Creates a tracker that disconnects at `max_attempts` (minimum 1).
    pub fn new(max_attempts: u32, shared_counter: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            shared: shared_counter,
            counters: Mutex::new(HashMap::new()),
            dead: Mutex::new(DeadFlags::default()),
        }
    }

    /// The configured threshold.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn bucket(&self, kind: AttemptKind) -> AttemptKind {
        if self.shared { AttemptKind::Login } else { kind }
    }

    /// Counts one failure and returns the counter's new value.
    pub fn record_failure(&self, identity: &IdentityKey, kind: AttemptKind) -> u32 {
        let key = (identity.clone(), self.bucket(kind));
        let mut counters = self.counters.lock();
        let count = counters.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        tracing::debug!(%identity, ?kind, count = *count, "attempt recorded");
        *count
    }

    /// Current counter value for one path (0 when absent).
    pub fn count(&self, identity: &IdentityKey, kind: AttemptKind) -> u32 {
        let key = (identity.clone(), self.bucket(kind));
        self.counters.lock().get(&key).copied().unwrap_or(0)
    }

    /// `true` once either path has reached the threshold.
    pub fn should_disconnect(&self, identity: &IdentityKey) -> bool {
        let counters = self.counters.lock();
        [AttemptKind::Join, AttemptKind::Login].into_iter().any(|kind| {
            counters
                .get(&(identity.clone(), kind))
                .is_some_and(|&count| count >= self.max_attempts)
        })
    }

    /// Decrements every counter by one, removing those that reach zero.
    ///
    /// Returns how many counters were removed. A counter can never go
    /// negative: it is deleted at exactly zero.
    pub fn decay(&self) -> usize {
        let mut counters = self.counters.lock();
        let before = counters.len();
        counters.retain(|_, count| {
            *count = count.saturating_sub(1);
            *count > 0
        });
        let removed = before - counters.len();
        if before > 0 {
            tracing::debug!(active = counters.len(), removed, "attempt counters decayed");
        }
        removed
    }

    /// Number of live counters (both paths).
    pub fn active_counters(&self) -> usize {
        self.counters.lock().len()
    }

    // -- Dead flags -------------------------------------------------------

    /// Sets the dead flag with a fresh stamp. Returns `false` if it was
    /// already set; the stamp is renewed either way.
    pub fn mark_dead(&self, identity: &IdentityKey) -> bool {
        let mut dead = self.dead.lock();
        dead.next_stamp += 1;
        let stamp = dead.next_stamp;
        dead.flags.insert(identity.clone(), stamp).is_none()
    }

    /// The stamp of the current dead flag, if set.
    pub fn dead_stamp(&self, identity: &IdentityKey) -> Option<u64> {
        self.dead.lock().flags.get(identity).copied()
    }

    /// Clears the dead flag. Missing flags are fine.
    pub fn clear_dead(&self, identity: &IdentityKey) -> bool {
        self.dead.lock().flags.remove(identity).is_some()
    }

    /// Clears the dead flag only if it still carries `stamp`.
    pub fn clear_dead_if(&self, identity: &IdentityKey, stamp: u64) -> bool {
        let mut dead = self.dead.lock();
        if dead.flags.get(identity) == Some(&stamp) {
            dead.flags.remove(identity);
            true
        } else {
            false
        }
    }

    pub fn is_dead(&self, identity: &IdentityKey) -> bool {
        self.dead.lock().flags.contains_key(identity)
    }
}
