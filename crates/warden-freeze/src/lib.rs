//! Inventory freeze and restore for Warden.
//!
//! While an identity is gated, everything it carries is moved out of its
//! live containers and into a [`FreezeSnapshot`], together with the
//! position it joined at. Authenticating replays the snapshot back slot by
//! slot.
//!
//! # Key types
//!
//! - [`PlayerInventory`]: the host seam for reading/writing live slots
//! - [`FreezeSnapshot`]: captured position and container contents
//! - [`FreezeVault`]: concurrent map of snapshots, keyed by identity
//! - [`SnapshotCorruption`]: non-fatal restore discrepancy

mod error;
mod inventory;
mod snapshot;
mod vault;

pub use error::SnapshotCorruption;
pub use inventory::{InMemoryInventory, PlayerInventory};
pub use snapshot::{FreezeSnapshot, RestoreReport, SlotMap};
pub use vault::FreezeVault;
