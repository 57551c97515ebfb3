//! The `PlayerInventory` trait: how the engine touches a live inventory.
//!
//! The host owns the real containers. The engine only needs four things
//! from them: which containers exist, how many slots each has, and a way
//! to read and write a slot by index. Addressing is strictly positional;
//! the engine never matches stacks by content.

use std::collections::BTreeMap;

use warden_protocol::{ContainerKind, ItemStack};

/// A player's live containers, as exposed by the host.
///
/// Implementations must be object safe to use behind
/// `&mut dyn PlayerInventory`, which is how the gatekeeper hands them
/// around.
pub trait PlayerInventory {
    /// Number of slots in `kind`, or `None` if the player lacks it.
    fn slot_count(&self, kind: ContainerKind) -> Option<usize>;

    /// A copy of the stack in one slot (`None` when empty or out of range).
    fn slot(&self, kind: ContainerKind, index: usize) -> Option<ItemStack>;

    /// Overwrites one slot. Out-of-range writes are ignored.
    fn set_slot(&mut self, kind: ContainerKind, index: usize, item: Option<ItemStack>);
}

/// A [`PlayerInventory`] backed by plain vectors.
///
/// Used by hosts that keep inventories in their own data model, and by
/// tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryInventory {
    containers: BTreeMap<ContainerKind, Vec<Option<ItemStack>>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a container with the given slots.
    pub fn with_container(mut self, kind: ContainerKind, slots: Vec<Option<ItemStack>>) -> Self {
        self.containers.insert(kind, slots);
        self
    }

    /// Adds an all-empty container of `len` slots.
    pub fn with_empty(self, kind: ContainerKind, len: usize) -> Self {
        self.with_container(kind, vec![None; len])
    }

    /// Read access to one container's slots.
    pub fn container(&self, kind: ContainerKind) -> Option<&[Option<ItemStack>]> {
        self.containers.get(&kind).map(Vec::as_slice)
    }

    /// Total number of occupied slots across all containers.
    pub fn occupied(&self) -> usize {
        self.containers
            .values()
            .flatten()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Removes a container entirely.
    pub fn remove_container(&mut self, kind: ContainerKind) -> bool {
        self.containers.remove(&kind).is_some()
    }
}

impl PlayerInventory for InMemoryInventory {
    fn slot_count(&self, kind: ContainerKind) -> Option<usize> {
        self.containers.get(&kind).map(Vec::len)
    }

    fn slot(&self, kind: ContainerKind, index: usize) -> Option<ItemStack> {
        self.containers.get(&kind)?.get(index)?.clone()
    }

    fn set_slot(&mut self, kind: ContainerKind, index: usize, item: Option<ItemStack>) {
        if let Some(slot) = self
            .containers
            .get_mut(&kind)
            .and_then(|slots| slots.get_mut(index))
        {
            *slot = item;
        }
    }
}
