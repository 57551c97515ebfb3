//! The session registry: the single source of truth for "is this identity gated".
//!
//! It's responsible for:
//! - Admitting identities as unauthenticated when they connect
//! - Releasing them when authentication succeeds
//! - Forgetting them on disconnect or kick
//! - Answering `is_gated` for every intercepted action
//!
//! # Concurrency note
//!
//! Unlike a registry owned by one accept loop, this map is touched from
//! three directions at once: synchronous host hooks (the action gate),
//! async event handlers, and delayed follow-up tasks that may run on any
//! runtime worker. The map therefore sits behind a `parking_lot::RwLock`.
//! Reads (`is_gated`) take the shared lock and never allocate, so the gate
//! stays cheap even when it is consulted for every block update.

use std::collections::HashMap;

use parking_lot::RwLock;
use warden_protocol::IdentityKey;

use crate::SessionState;

/// Tracks every identity that is currently gated.
///
/// ## Lifecycle
///
/// ```text
/// admit() ──→ [gated] ──→ release()  (login / register succeeded)
///                │
///                └──────→ forget()   (disconnect)
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<IdentityKey, SessionState>>,
}

impl SessionRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an identity as unauthenticated.
    ///
    /// `registered` records whether a credential existed at admission.
    ///
    /// Returns `true` if a new session was created. Admitting an identity
    /// that is already gated is a no-op returning `false`: the original
    /// `joined_at` is kept and no second session appears.
    pub fn admit(&self, identity: IdentityKey, registered: bool) -> bool {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&identity) {
            tracing::debug!(%identity, "admit ignored, identity already gated");
            return false;
        }
        tracing::info!(%identity, "identity admitted as unauthenticated");
        sessions.insert(identity.clone(), SessionState::new(identity, registered));
        true
    }

    /// Ends gating because authentication succeeded.
    ///
    /// Returns `true` if the identity was gated. The removal happens under
    /// the write lock, so a concurrent [`is_gated`](Self::is_gated) sees
    /// either the old or the new state, never a torn one.
    pub fn release(&self, identity: &IdentityKey) -> bool {
        let removed = self.sessions.write().remove(identity).is_some();
        if removed {
            tracing::info!(%identity, "identity released");
        }
        removed
    }

    /// Drops the session without treating it as an authentication.
    ///
    /// Used on disconnect. Missing entries are fine; cleanup is fail-open.
    pub fn forget(&self, identity: &IdentityKey) -> bool {
        let removed = self.sessions.write().remove(identity).is_some();
        if removed {
            tracing::debug!(%identity, "session forgotten");
        }
        removed
    }

    /// Returns `true` while the identity has not authenticated.
    pub fn is_gated(&self, identity: &IdentityKey) -> bool {
        self.sessions.read().contains_key(identity)
    }

    /// Runs `f` while holding the shared lock, but only if the identity
    /// is gated.
    ///
    /// This is the check-then-act primitive for delayed follow-ups: a
    /// concurrent `release` must wait until `f` returns, so `f` can never
    /// act on an identity that authenticated halfway through. `f` must not
    /// call back into this registry's write methods.
    pub fn while_gated<R>(
        &self,
        identity: &IdentityKey,
        f: impl FnOnce(&SessionState) -> R,
    ) -> Option<R> {
        let sessions = self.sessions.read();
        sessions.get(identity).map(f)
    }

    /// Returns a copy of the session, if any.
    pub fn get(&self, identity: &IdentityKey) -> Option<SessionState> {
        self.sessions.read().get(identity).cloned()
    }

    /// Every identity currently gated, in no particular order.
    pub fn gated(&self) -> Vec<IdentityKey> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Number of gated identities.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if nobody is gated.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
