//! The freeze vault: every live snapshot, keyed by identity.

use std::collections::HashMap;

use parking_lot::RwLock;
use warden_protocol::{IdentityKey, Position};

use crate::{FreezeSnapshot, PlayerInventory, RestoreReport};

/// Holds the snapshot of every frozen identity.
///
/// All mutating operations take the write lock for their full duration,
/// including the host inventory calls they make. Inventory calls are
/// synchronous and in-memory on the host side, so the lock is held for
/// microseconds; in exchange, capture and restore are atomic with respect
/// to each other and to the position loop.
#[derive(Debug, Default)]
pub struct FreezeVault {
    snapshots: RwLock<HashMap<IdentityKey, FreezeSnapshot>>,
}

impl FreezeVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezes an identity's inventory at `position`.
    ///
    /// Returns `false` and leaves everything untouched if the identity is
    /// already frozen: a second capture would record the already-emptied
    /// containers and overwrite the real items.
    pub fn capture<I>(&self, identity: &IdentityKey, position: Position, inventory: &mut I) -> bool
    where
        I: PlayerInventory + ?Sized,
    {
        let mut snapshots = self.snapshots.write();
        if snapshots.contains_key(identity) {
            tracing::debug!(%identity, "capture skipped, already frozen");
            return false;
        }

        let snapshot = FreezeSnapshot::read(position, inventory);
        let items = snapshot.item_count();
        // Stored before the live slots are cleared.
        let stored = snapshots.entry(identity.clone()).or_insert(snapshot);
        stored.clear_live(inventory);

        tracing::info!(%identity, %position, items, "inventory frozen");
        true
    }

    /// Replays the identity's snapshot into `inventory`, then deletes it.
    ///
    /// Returns `None` if the identity wasn't frozen. Corruptions are logged
    /// at error level and returned in the report; they never stop the rest
    /// of the restore.
    pub fn restore<I>(&self, identity: &IdentityKey, inventory: &mut I) -> Option<RestoreReport>
    where
        I: PlayerInventory + ?Sized,
    {
        let mut snapshots = self.snapshots.write();
        let report = snapshots.get(identity)?.restore_into(inventory);
        snapshots.remove(identity);
        drop(snapshots);

        for corruption in &report.corruptions {
            tracing::error!(%identity, %corruption, "inventory restoration corrupted");
        }
        tracing::info!(
            %identity,
            restored = report.restored_slots,
            corrupted = report.corruptions.len(),
            "inventory restored"
        );
        Some(report)
    }

    /// Deletes a snapshot without restoring it.
    pub fn discard(&self, identity: &IdentityKey) -> bool {
        let removed = self.snapshots.write().remove(identity);
        if let Some(snapshot) = &removed {
            tracing::debug!(%identity, items = snapshot.item_count(), "snapshot discarded");
        }
        removed.is_some()
    }

    pub fn is_frozen(&self, identity: &IdentityKey) -> bool {
        self.snapshots.read().contains_key(identity)
    }

    /// The captured position of a frozen identity.
    pub fn position(&self, identity: &IdentityKey) -> Option<Position> {
        self.snapshots.read().get(identity).map(|s| s.position)
    }

    /// A copy of the snapshot, if any.
    pub fn get(&self, identity: &IdentityKey) -> Option<FreezeSnapshot> {
        self.snapshots.read().get(identity).cloned()
    }

    /// Every frozen identity with its pin position.
    ///
    /// Copies out under the read lock so the caller can teleport without
    /// holding it.
    pub fn pinned(&self) -> Vec<(IdentityKey, Position)> {
        self.snapshots
            .read()
            .iter()
            .map(|(id, s)| (id.clone(), s.position))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}
