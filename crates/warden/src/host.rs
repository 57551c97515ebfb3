//! The host extension-point API.
//!
//! Warden never reaches into the game engine. Instead the engine
//! implements [`Host`], and calls Warden's event handlers and gate hooks
//! from its own event dispatch.
//!
//! # Threading
//!
//! Host methods are called from event handlers, from the periodic loops,
//! and from delayed follow-ups, so they may run on any runtime worker.
//! They must not call back into Warden.

use warden_freeze::PlayerInventory;
use warden_protocol::{BlockPos, IdentityKey, Position};

/// What the game engine provides to the gatekeeper.
///
/// # Example
///
/// ```rust,ignore
/// impl Host for MyServer {
///     fn is_online(&self, identity: &IdentityKey) -> bool {
///         self.players.contains_key(identity.as_str())
///     }
///     // ...
/// }
/// ```
pub trait Host: Send + Sync + 'static {
    /// `true` while a participant with this identity is connected.
    fn is_online(&self, identity: &IdentityKey) -> bool;

    /// Identity keys of every connected participant whose display name is
    /// exactly `name`. Used to resolve admin targets.
    fn identities_named(&self, name: &str) -> Vec<IdentityKey>;

    /// Current avatar position, or `None` if the identity isn't online.
    fn position(&self, identity: &IdentityKey) -> Option<Position>;

    fn teleport(&self, identity: &IdentityKey, position: Position);

    /// Terminates the connection. The host later fires
    /// [`on_disconnect`](crate::Warden::on_disconnect) as usual, while the
    /// participant's inventory is still reachable through
    /// [`with_inventory`](Self::with_inventory). May be called while
    /// Warden holds a registry lock, so it must only queue the teardown.
    fn disconnect(&self, identity: &IdentityKey, reason: &str);

    fn send_message(&self, identity: &IdentityKey, message: &str);

    /// Runs `f` against the identity's live containers.
    ///
    /// Returns `None` without calling `f` if the identity isn't online.
    fn with_inventory<R>(
        &self,
        identity: &IdentityKey,
        f: impl FnOnce(&mut dyn PlayerInventory) -> R,
    ) -> Option<R>;

    /// `false` while the avatar is dead (death screen shown).
    fn is_alive(&self, identity: &IdentityKey) -> bool;

    /// Places `block` at `pos`, overwriting whatever is there.
    fn place_block(&self, pos: BlockPos, block: &str);

    /// Pushes the identity's inventory to its client after a restore.
    fn sync_inventory(&self, identity: &IdentityKey);
}
