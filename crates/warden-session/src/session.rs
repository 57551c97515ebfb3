//! Session types: the record of an identity that has not authenticated yet.
//!
//! A session exists ONLY while an identity is gated. Authenticated players
//! have no session at all: the absence of a record is what "trusted"
//! means. This keeps the hot read on the action gate a single map lookup.

use std::time::Instant;

use warden_protocol::IdentityKey;

/// The state kept for one gated identity.
///
/// ```text
///   Anonymous ──(connect, gated by policy)──→ [SessionState exists]
///       ↑                                            │
///       └──────(login / register / disconnect)───────┘
/// ```
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Which identity this session belongs to.
    pub identity: IdentityKey,

    /// When the identity was admitted. `Instant` is monotonic, so clock
    /// changes on the host never make a session look older than it is.
    pub joined_at: Instant,

    /// Whether a credential existed when the identity was admitted.
    ///
    /// Disconnect cleanup decides between restoring and discarding the
    /// snapshot from this, so a store outage after connect can't turn a
    /// registered identity into an unregistered one.
    pub registered: bool,
}

impl SessionState {
    /// Creates a session stamped with the current instant.
    pub fn new(identity: IdentityKey, registered: bool) -> Self {
        Self {
            identity,
            joined_at: Instant::now(),
            registered,
        }
    }
}
