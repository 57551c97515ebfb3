//! Shared vocabulary for Warden.
//!
//! This crate defines the types every other Warden crate speaks:
//!
//! - **Types** ([`IdentityKey`], [`Position`], [`ItemStack`],
//!   [`ContainerKind`], [`CommandReply`], etc.): the values that cross
//!   the boundary between the host game server and the gatekeeper.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how persisted values
//!   (the credential blob) are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sessions, snapshots, or timers.
//! It only names things and knows how to serialize them.
//!
//! ```text
//! Host (events, hooks) → Protocol (IdentityKey, ItemStack) → Session / Freeze
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AddressingMode, BlockPos, CommandReply, CommandStatus, ContainerKind,
    IdentityKey, ItemStack, Position,
};
