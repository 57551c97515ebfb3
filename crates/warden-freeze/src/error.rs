//! Corruption signals raised while restoring a snapshot.

use warden_protocol::{ContainerKind, ItemStack};

/// One place where a snapshot and the live inventory disagreed.
///
/// Never fatal. Restoration skips the affected slot (or container) and
/// carries on: losing one item beats losing the whole inventory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotCorruption {
    /// The live inventory has a container the snapshot never recorded.
    #[error("snapshot has no {kind} container")]
    MissingContainer { kind: ContainerKind },

    /// The live container has a slot the snapshot has no entry for.
    #[error("snapshot has no entry for {kind} slot {slot}")]
    MissingSlot { kind: ContainerKind, slot: usize },

    /// The snapshot holds an item for a slot that no longer exists live.
    #[error("{kind} slot {slot} no longer exists, could not return {item:?}")]
    Unplaceable {
        kind: ContainerKind,
        slot: usize,
        item: ItemStack,
    },
}
