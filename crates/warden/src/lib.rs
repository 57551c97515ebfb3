//! # Warden
//!
//! Session-authentication gatekeeper for persistent multiplayer servers.
//!
//! Every connecting identity must present a password before it is treated
//! as a trusted participant. Until then its inventory is frozen, its avatar
//! is pinned to where it joined, and every gameplay action it attempts is
//! vetoed.
//!
//! The host engine implements [`Host`] and wires its events, commands, and
//! interception points to a [`Warden`]:
//!
//! | Host side                 | Warden                                            |
//! |---------------------------|---------------------------------------------------|
//! | player joined             | [`Warden::on_connect`]                            |
//! | avatar spawned            | [`Warden::on_world_ready`]                        |
//! | died / respawned          | [`Warden::on_death`] / [`Warden::on_respawn`]     |
//! | player left               | [`Warden::on_disconnect`]                         |
//! | `/register`, `/login`, …  | [`Warden::register`], [`Warden::login`], …        |
//! | action pre-checks         | [`Warden::allow_command`], [`Warden::allow_block_break`], … |
//! | server start              | [`Warden::spawn_background`]                      |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use warden::prelude::*;
//!
//! let warden = WardenBuilder::new()
//!     .config(WardenConfig::load("warden.json"))
//!     .build(Arc::new(my_host), FileBlobStore::new("saves"))?;
//! let background = warden.spawn_background();
//!
//! warden.on_connect(&IdentityKey::from("bob")).await;
//! let reply = warden.login(&IdentityKey::from("bob"), Some("hunter2")).await;
//! ```

pub mod commands;
mod config;
mod error;
pub mod gate;
pub mod handler;
mod host;
pub mod runtime;
mod state;

pub use config::{Messages, WardenConfig};
pub use error::{ConfigError, WardenError};
pub use gate::Verdict;
pub use host::Host;
pub use runtime::BackgroundHandle;
pub use state::{Warden, WardenBuilder};

pub use warden_freeze as freeze;
pub use warden_protocol as protocol;
pub use warden_session as session;
pub use warden_tick as tick;

/// Everything a host integration usually needs.
pub mod prelude {
    pub use std::sync::Arc;

    pub use warden_freeze::{FreezeSnapshot, PlayerInventory, RestoreReport};
    pub use warden_protocol::{
        AddressingMode, BlockPos, CommandReply, CommandStatus, ContainerKind, IdentityKey,
        ItemStack, Position,
    };
    pub use warden_session::{BlobStore, FileBlobStore, MemoryBlobStore};

    pub use crate::{Host, Messages, Verdict, Warden, WardenBuilder, WardenConfig, WardenError};
}
