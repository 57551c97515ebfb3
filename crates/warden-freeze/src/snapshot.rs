//! Freeze snapshots: the position and container contents held while an
//! identity is gated.
//!
//! Capture happens in two phases:
//!
//! ```text
//! read()        every captured container → scratch map (live untouched)
//! clear_live()  every slot that held an item → empty
//! ```
//!
//! The vault stores the snapshot BETWEEN the two phases, so there is no
//! moment at which items have left the live inventory without being
//! recorded somewhere.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warden_protocol::{ContainerKind, ItemStack, Position};

use crate::{PlayerInventory, SnapshotCorruption};

/// Slot index → stack (or empty) for one container.
pub type SlotMap = BTreeMap<usize, Option<ItemStack>>;

/// A captured position plus the contents of every captured container.
///
/// The set of container kinds and their slot counts is fixed at capture
/// time and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeSnapshot {
    /// Where the identity stood at capture; the position loop pins here.
    pub position: Position,
    containers: BTreeMap<ContainerKind, SlotMap>,
}

/// Outcome of [`FreezeSnapshot::restore_into`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Slots written back (empty slots included).
    pub restored_slots: usize,
    /// Every disagreement found; empty on a clean restore.
    pub corruptions: Vec<SnapshotCorruption>,
}

impl RestoreReport {
    /// `true` when nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.corruptions.is_empty()
    }
}

impl FreezeSnapshot {
    /// Builds a snapshot from already-captured parts.
    pub fn from_parts(position: Position, containers: BTreeMap<ContainerKind, SlotMap>) -> Self {
        Self {
            position,
            containers,
        }
    }

    /// Phase one: records every captured container without touching it.
    ///
    /// The creative container is skipped even if the player has one.
    pub fn read<I>(position: Position, inventory: &I) -> Self
    where
        I: PlayerInventory + ?Sized,
    {
        let mut containers = BTreeMap::new();
        for kind in ContainerKind::CAPTURED {
            let Some(len) = inventory.slot_count(kind) else {
                continue;
            };
            let slots: SlotMap = (0..len).map(|i| (i, inventory.slot(kind, i))).collect();
            containers.insert(kind, slots);
        }
        Self {
            position,
            containers,
        }
    }

    /// Phase two: empties every live slot this snapshot recorded an item for.
    pub fn clear_live<I>(&self, inventory: &mut I)
    where
        I: PlayerInventory + ?Sized,
    {
        for (&kind, slots) in &self.containers {
            for (&index, item) in slots {
                if item.is_some() {
                    inventory.set_slot(kind, index, None);
                }
            }
        }
    }

    /// Both phases in one call, for callers that don't store the snapshot
    /// in between.
    pub fn capture<I>(position: Position, inventory: &mut I) -> Self
    where
        I: PlayerInventory + ?Sized,
    {
        let snapshot = Self::read(position, inventory);
        snapshot.clear_live(inventory);
        snapshot
    }

    /// Replays the snapshot into the live inventory by slot index.
    ///
    /// Walks the LIVE containers. Anything the snapshot can't account for
    /// is reported and skipped; everything else is still restored. A
    /// container missing from the snapshot is reported once, not once per
    /// slot.
    pub fn restore_into<I>(&self, inventory: &mut I) -> RestoreReport
    where
        I: PlayerInventory + ?Sized,
    {
        let mut report = RestoreReport::default();

        for kind in ContainerKind::CAPTURED {
            let live_len = inventory.slot_count(kind);
            let recorded = self.containers.get(&kind);

            match (live_len, recorded) {
                (None, None) => {}
                (Some(_), None) => {
                    report
                        .corruptions
                        .push(SnapshotCorruption::MissingContainer { kind });
                }
                (live_len, Some(slots)) => {
                    let live_len = live_len.unwrap_or(0);
                    for index in 0..live_len {
                        match slots.get(&index) {
                            Some(item) => {
                                inventory.set_slot(kind, index, item.clone());
                                report.restored_slots += 1;
                            }
                            None => report
                                .corruptions
                                .push(SnapshotCorruption::MissingSlot { kind, slot: index }),
                        }
                    }
                    for (&slot, item) in slots.range(live_len..) {
                        if let Some(item) = item {
                            report.corruptions.push(SnapshotCorruption::Unplaceable {
                                kind,
                                slot,
                                item: item.clone(),
                            });
                        }
                    }
                }
            }
        }

        report
    }

    /// Container kinds recorded by this snapshot.
    pub fn kinds(&self) -> impl Iterator<Item = ContainerKind> + '_ {
        self.containers.keys().copied()
    }

    /// The recorded slots of one container.
    pub fn slots(&self, kind: ContainerKind) -> Option<&SlotMap> {
        self.containers.get(&kind)
    }

    /// Number of recorded slots that held an item.
    pub fn item_count(&self) -> usize {
        self.containers
            .values()
            .flat_map(BTreeMap::values)
            .filter(|item| item.is_some())
            .count()
    }
}
