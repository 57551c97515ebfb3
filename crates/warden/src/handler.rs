//! Connection lifecycle event handlers.
//!
//! The host calls these from its own event dispatch:
//!
//! ```text
//! on_connect ──→ on_world_ready ──→ (on_death ──→ on_respawn)* ──→ on_disconnect
//! ```
//!
//! Two follow-ups are scheduled from `on_world_ready` (the grace-timeout
//! kick and the deferred freeze) and one from `on_respawn` (clearing the
//! dead flag). Each re-checks current state when it fires, since the
//! identity may have authenticated, left, or reconnected in the meantime.
//!
//! Follow-ups are only scheduled when a handler runs inside a Tokio
//! runtime; elsewhere they are dropped with a warning.

use warden_protocol::IdentityKey;
use warden_session::{AttemptKind, BlobStore};
use warden_tick::schedule;

use crate::{Host, Warden};

impl<H: Host, B: BlobStore> Warden<H, B> {
    /// A participant connected.
    ///
    /// Counts one join attempt, then gates and freezes registered
    /// identities (and, by policy, unregistered ones, whose freeze is
    /// deferred until [`on_world_ready`](Self::on_world_ready)). If the
    /// join count has reached the threshold the identity is kicked, but
    /// only after it is gated, so it holds nothing usable while the host
    /// tears the connection down.
    pub async fn on_connect(&self, identity: &IdentityKey) {
        let state = &self.inner;
        let messages = &state.config.messages;

        let joins = state.attempts.record_failure(identity, AttemptKind::Join);
        let over_limit = state.attempts.should_disconnect(identity);

        if state.sessions.is_gated(identity) {
            tracing::debug!(%identity, "connect while already gated, keeping session");
        } else {
            self.gate_on_connect(identity, !over_limit).await;
        }

        if over_limit {
            tracing::warn!(%identity, joins, "too many join attempts, disconnecting");
            state.host.disconnect(identity, &messages.too_many_attempts);
        }
    }

    async fn gate_on_connect(&self, identity: &IdentityKey, prompt: bool) {
        let state = &self.inner;
        let messages = &state.config.messages;

        if state.vault.discard(identity) {
            tracing::warn!(%identity, "stale snapshot found at connect, discarded");
        }

        if state.credentials.contains(identity).await {
            state.sessions.admit(identity.clone(), true);
            self.freeze(identity);
            if !state.host.is_alive(identity) {
                state.attempts.mark_dead(identity);
            }
            if prompt {
                state.host.send_message(identity, &messages.login_prompt);
            }
        } else {
            if state.config.freeze_unregistered {
                state.sessions.admit(identity.clone(), false);
            }
            if prompt {
                state.host.send_message(identity, &messages.register_prompt);
            }
        }
    }

    /// The identity's avatar has fully entered the world.
    ///
    /// Schedules the grace-timeout kick and, for a gated identity that
    /// isn't frozen yet, the deferred freeze.
    pub fn on_world_ready(&self, identity: &IdentityKey) {
        let state = &self.inner;
        let Some(session) = state.sessions.get(identity) else {
            return;
        };

        let warden = self.clone();
        let id = identity.clone();
        let joined_at = session.joined_at;
        schedule("login-timeout", state.config.kick_after(), async move {
            warden.kick_if_still_gated(&id, joined_at);
        });

        if !state.vault.is_frozen(identity) {
            let warden = self.clone();
            let id = identity.clone();
            schedule(
                "deferred-freeze",
                state.config.unregistered_freeze_delay(),
                async move {
                    warden.freeze_if_still_gated(&id);
                },
            );
        }
    }

    /// The identity's avatar died.
    pub fn on_death(&self, identity: &IdentityKey) {
        if self.inner.sessions.is_gated(identity) && self.inner.attempts.mark_dead(identity) {
            tracing::debug!(%identity, "gated identity died, pinning paused");
        }
    }

    /// The identity respawned. Pinning resumes after the revive grace,
    /// unless the identity died again in the meantime.
    pub fn on_respawn(&self, identity: &IdentityKey) {
        let Some(stamp) = self.inner.attempts.dead_stamp(identity) else {
            return;
        };
        let warden = self.clone();
        let id = identity.clone();
        schedule("revive-grace", self.inner.config.revive_grace(), async move {
            if warden.inner.attempts.clear_dead_if(&id, stamp) {
                tracing::debug!(identity = %id, "revive grace over, pinning resumed");
            }
        });
    }

    /// The participant disconnected.
    ///
    /// A registered identity gets its snapshot restored before removal so
    /// the host saves real items. A never-registered identity's snapshot
    /// is discarded. Registration is judged from the session, as recorded
    /// at connect; a snapshot without a session is restored. Missing state
    /// is never an error. Attempt counters are kept and keep decaying.
    pub async fn on_disconnect(&self, identity: &IdentityKey) {
        let state = &self.inner;

        if state.vault.is_frozen(identity) {
            let registered = state
                .sessions
                .get(identity)
                .is_none_or(|session| session.registered);
            if registered {
                let report = state
                    .host
                    .with_inventory(identity, |inv| state.vault.restore(identity, inv))
                    .flatten();
                if report.is_none() {
                    // Inventory already gone on the host side.
                    state.vault.discard(identity);
                }
            } else {
                state.vault.discard(identity);
            }
        }

        state.sessions.forget(identity);
        state.attempts.clear_dead(identity);
        tracing::debug!(%identity, "disconnect cleanup done");
    }

    /// Captures position and containers. `false` if the identity is
    /// offline or already frozen.
    pub(crate) fn freeze(&self, identity: &IdentityKey) -> bool {
        let state = &self.inner;
        let Some(position) = state.host.position(identity) else {
            return false;
        };
        state
            .host
            .with_inventory(identity, |inv| state.vault.capture(identity, position, inv))
            .unwrap_or(false)
    }

    /// Deferred-freeze body. Runs the capture under the registry's shared
    /// lock so a concurrent login can't release the identity halfway.
    fn freeze_if_still_gated(&self, identity: &IdentityKey) {
        let state = &self.inner;
        let frozen = state
            .sessions
            .while_gated(identity, |_| {
                !state.vault.is_frozen(identity) && self.freeze(identity)
            })
            .unwrap_or(false);
        if frozen {
            state.host.sync_inventory(identity);
        } else {
            tracing::trace!(%identity, "deferred freeze skipped");
        }
    }

    /// Grace-timeout body. Kicks only the session that was live at
    /// world-ready, under the registry's shared lock so a concurrent login
    /// can't slip in between the check and the kick.
    ///
    /// The session stays in place: the identity remains gated until the
    /// host's disconnect event runs [`on_disconnect`](Self::on_disconnect).
    fn kick_if_still_gated(&self, identity: &IdentityKey, joined_at: std::time::Instant) {
        let state = &self.inner;
        if !state.host.is_online(identity) {
            return;
        }
        state.sessions.while_gated(identity, |session| {
            if session.joined_at != joined_at {
                return;
            }
            let count = state.attempts.record_failure(identity, AttemptKind::Join);
            tracing::info!(%identity, count, "login timeout, kicking");
            state.host.disconnect(identity, &state.config.messages.login_timeout);
        });
    }
}
