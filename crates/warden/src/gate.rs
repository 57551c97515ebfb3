//! The action gate: interception hooks the host calls before letting a
//! gameplay action through.
//!
//! Every hook is a synchronous registry read and returns a [`Verdict`].
//! A gated identity gets a polite denial, never a panic or an error.
//! `login` and `register` are the only commands a gated identity may run.

use warden_protocol::{BlockPos, IdentityKey};
use warden_session::BlobStore;
use warden_tick::schedule;

use crate::{Host, Warden};

/// Commands that are permitted regardless of gate state.
const ALWAYS_ALLOWED: [&str; 2] = ["login", "register"];

/// The answer to an interception hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Suppress the action; the string is the configured denial line.
    Deny(String),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// The denial line, if the action was denied.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny(message) => Some(message),
        }
    }
}

impl<H: Host, B: BlobStore> Warden<H, B> {
    fn gate(&self, identity: &IdentityKey, action: &'static str) -> Verdict {
        if self.inner.sessions.is_gated(identity) {
            tracing::trace!(%identity, action, "action denied");
            Verdict::Deny(self.inner.config.messages.action_denied.clone())
        } else {
            Verdict::Allow
        }
    }

    /// Command-dispatch pre-check. `command` is the raw command line,
    /// with or without a leading `/`.
    pub fn allow_command(&self, identity: &IdentityKey, command: &str) -> Verdict {
        let name = command
            .trim_start()
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or_default();
        if ALWAYS_ALLOWED.iter().any(|c| c.eq_ignore_ascii_case(name)) {
            return Verdict::Allow;
        }
        self.gate(identity, "command")
    }

    /// Inventory-access pre-check (opening, moving, dropping items).
    pub fn allow_inventory_access(&self, identity: &IdentityKey) -> Verdict {
        self.gate(identity, "inventory")
    }

    pub fn allow_block_place(&self, identity: &IdentityKey, pos: BlockPos) -> Verdict {
        let verdict = self.gate(identity, "block_place");
        if !verdict.is_allowed() {
            tracing::trace!(%identity, ?pos, "block place vetoed");
        }
        verdict
    }

    /// Block-break pre-check.
    ///
    /// A predictive client may already show the block as broken when the
    /// veto arrives, so a denial also re-places `original_block` at `pos`
    /// after `block_break_undo_ms`. Called from a thread without a Tokio
    /// runtime, the veto still stands but nothing is re-placed.
    pub fn allow_block_break(
        &self,
        identity: &IdentityKey,
        pos: BlockPos,
        original_block: &str,
    ) -> Verdict {
        let verdict = self.gate(identity, "block_break");
        if verdict.is_allowed() {
            return verdict;
        }
        if let Some(delay) = self.inner.config.block_break_undo() {
            let host = std::sync::Arc::clone(&self.inner.host);
            let block = original_block.to_owned();
            let scheduled = schedule("block-break-undo", delay, async move {
                host.place_block(pos, &block);
            });
            if !scheduled {
                tracing::warn!(%identity, ?pos, "block-break undo skipped, plain veto");
            }
        }
        verdict
    }

    /// Combat-damage pre-check. Denied when either side is gated, so a
    /// frozen avatar neither deals nor takes damage.
    pub fn allow_damage(
        &self,
        attacker: Option<&IdentityKey>,
        victim: Option<&IdentityKey>,
    ) -> Verdict {
        for identity in attacker.into_iter().chain(victim) {
            let verdict = self.gate(identity, "damage");
            if !verdict.is_allowed() {
                return verdict;
            }
        }
        Verdict::Allow
    }

    pub fn allow_durability_loss(&self, identity: &IdentityKey) -> Verdict {
        self.gate(identity, "durability")
    }

    pub fn allow_hunger_loss(&self, identity: &IdentityKey) -> Verdict {
        self.gate(identity, "hunger")
    }
}
