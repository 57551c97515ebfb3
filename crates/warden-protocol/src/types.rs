//! Core types shared between the host and the gatekeeper.
//!
//! Everything here is plain data: identities, coordinates, item stacks,
//! container kinds, and the result of a chat command.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The key that addresses one participant's session and credential record.
///
/// A deployment picks ONE [`AddressingMode`] and every key it produces
/// follows that mode: either the account's stable identifier or its
/// display name. The gatekeeper treats the key as opaque either way;
/// nothing inside Warden branches on which mode produced it.
///
/// `#[serde(transparent)]` stores the key as a bare JSON string, so the
/// credential blob is a plain `{ "alice": "<hash>" }` object.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IdentityKey(pub String);

impl IdentityKey {
    /// Borrows the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for IdentityKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which property of a participant the host uses as its [`IdentityKey`].
///
/// Chosen once per deployment. Switching modes on a live server orphans
/// every existing credential, which is why the credential blob name is
/// namespaced by mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AddressingMode {
    /// Stable per-account identifier (survives renames).
    StableId,
    /// Human-readable player name.
    #[default]
    DisplayName,
}

impl AddressingMode {
    /// Short tag used to namespace persisted data.
    pub fn tag(self) -> &'static str {
        match self {
            Self::StableId => "stable_id",
            Self::DisplayName => "display_name",
        }
    }
}

// ---------------------------------------------------------------------------
// World coordinates
// ---------------------------------------------------------------------------

/// An entity position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// The integer coordinates of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One stack of items sitting in a slot.
///
/// The gatekeeper never inspects stacks. It only moves them out of the
/// live inventory and back in, so the fields only need to survive a
/// clone unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item code, e.g. `"game:pickaxe-iron"`.
    pub code: String,
    /// How many items are in the stack.
    pub quantity: u32,
    /// Remaining durability for tools and armor; `None` for stackables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durability: Option<u32>,
}

impl ItemStack {
    /// Creates a stack without durability.
    pub fn new(code: impl Into<String>, quantity: u32) -> Self {
        Self {
            code: code.into(),
            quantity,
            durability: None,
        }
    }

    /// Builder-style durability setter.
    pub fn with_durability(mut self, durability: u32) -> Self {
        self.durability = Some(durability);
        self
    }
}

/// The closed set of containers a player carries.
///
/// `Creative` exists so hosts can describe every container they have, but
/// it is never captured: its contents are generated by the game, not
/// owned by the player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Hotbar,
    Backpack,
    /// Items lying on the ground that the player is about to pick up.
    Ground,
    /// The stack held on the mouse cursor.
    Cursor,
    CraftingGrid,
    /// Worn armor and clothing.
    Character,
    Creative,
}

impl ContainerKind {
    /// Every kind that is captured by a freeze, in capture order.
    pub const CAPTURED: [ContainerKind; 6] = [
        Self::Hotbar,
        Self::Backpack,
        Self::Ground,
        Self::Cursor,
        Self::CraftingGrid,
        Self::Character,
    ];

    /// Returns `false` only for the creative container.
    pub fn is_captured(self) -> bool {
        !matches!(self, Self::Creative)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hotbar => "hotbar",
            Self::Backpack => "backpack",
            Self::Ground => "ground",
            Self::Cursor => "cursor",
            Self::CraftingGrid => "crafting_grid",
            Self::Character => "character",
            Self::Creative => "creative",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Command results
// ---------------------------------------------------------------------------

/// Machine-readable outcome of an authentication command.
///
/// The numeric codes are part of the command surface: external tooling
/// (scripts watching the console, client mods) matches on them, so an
/// existing code must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    MissingArgument,
    AlreadyRegistered,
    NotRegistered,
    InvalidCredential,
    PasswordChanged,
    MalformedAdminTarget,
    AdminPasswordChanged,
    MalformedAdminPassword,
    Registered,
    LoggedIn,
    AlreadyAuthenticated,
    TooManyAttempts,
    NotAuthenticated,
    AmbiguousIdentity,
    UnknownIdentity,
    StorageFailure,
}

impl CommandStatus {
    /// The stable numeric code for this status.
    pub fn code(self) -> u8 {
        match self {
            Self::MissingArgument => 0,
            Self::AlreadyRegistered => 1,
            Self::NotRegistered => 2,
            Self::InvalidCredential => 3,
            Self::PasswordChanged => 4,
            Self::MalformedAdminTarget => 5,
            Self::AdminPasswordChanged => 6,
            Self::MalformedAdminPassword => 7,
            Self::Registered => 8,
            Self::LoggedIn => 9,
            Self::AlreadyAuthenticated => 10,
            Self::TooManyAttempts => 11,
            Self::NotAuthenticated => 12,
            Self::AmbiguousIdentity => 13,
            Self::UnknownIdentity => 14,
            Self::StorageFailure => 15,
        }
    }

    /// `true` for the statuses that report a completed change.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            Self::PasswordChanged
                | Self::AdminPasswordChanged
                | Self::Registered
                | Self::LoggedIn
        )
    }
}

/// What a command handler hands back to the host's command dispatcher:
/// a short human-readable line plus the status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub status: CommandStatus,
    pub message: String,
}

impl CommandReply {
    pub fn new(status: CommandStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for `self.status.code()`.
    pub fn code(&self) -> u8 {
        self.status.code()
    }
}
