//! Drives Warden against an in-memory world.
//!
//! ```text
//! RUST_LOG=debug cargo run -p sandbox -- [config.json]
//! ```

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use warden::freeze::InMemoryInventory;
use warden::prelude::*;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

struct Avatar {
    position: Position,
    inventory: InMemoryInventory,
}

/// A world with no engine behind it: avatars, their inventories, and a
/// log line for every side effect.
#[derive(Default)]
struct SandboxWorld {
    avatars: Mutex<HashMap<IdentityKey, Avatar>>,
}

impl SandboxWorld {
    fn spawn(&self, identity: &IdentityKey, position: Position, inventory: InMemoryInventory) {
        self.avatars.lock().insert(
            identity.clone(),
            Avatar {
                position,
                inventory,
            },
        );
    }

    fn despawn(&self, identity: &IdentityKey) {
        self.avatars.lock().remove(identity);
    }

    fn walk(&self, identity: &IdentityKey, position: Position) {
        if let Some(a) = self.avatars.lock().get_mut(identity) {
            a.position = position;
        }
    }

    fn occupied(&self, identity: &IdentityKey) -> usize {
        self.avatars
            .lock()
            .get(identity)
            .map_or(0, |a| a.inventory.occupied())
    }
}

impl Host for SandboxWorld {
    fn is_online(&self, identity: &IdentityKey) -> bool {
        self.avatars.lock().contains_key(identity)
    }

    fn identities_named(&self, name: &str) -> Vec<IdentityKey> {
        self.avatars
            .lock()
            .keys()
            .filter(|id| id.as_str() == name)
            .cloned()
            .collect()
    }

    fn position(&self, identity: &IdentityKey) -> Option<Position> {
        self.avatars.lock().get(identity).map(|a| a.position)
    }

    fn teleport(&self, identity: &IdentityKey, position: Position) {
        if let Some(a) = self.avatars.lock().get_mut(identity) {
            if a.position != position {
                tracing::info!(%identity, from = %a.position, to = %position, "teleported");
            }
            a.position = position;
        }
    }

    fn disconnect(&self, identity: &IdentityKey, reason: &str) {
        tracing::info!(%identity, reason, "disconnect requested");
    }

    fn send_message(&self, identity: &IdentityKey, message: &str) {
        tracing::info!(%identity, "chat: {message}");
    }

    fn with_inventory<R>(
        &self,
        identity: &IdentityKey,
        f: impl FnOnce(&mut dyn PlayerInventory) -> R,
    ) -> Option<R> {
        let mut avatars = self.avatars.lock();
        let avatar = avatars.get_mut(identity)?;
        Some(f(&mut avatar.inventory))
    }

    fn is_alive(&self, _identity: &IdentityKey) -> bool {
        true
    }

    fn place_block(&self, pos: BlockPos, block: &str) {
        tracing::info!(?pos, block, "block re-placed");
    }

    fn sync_inventory(&self, identity: &IdentityKey) {
        tracing::debug!(%identity, "inventory pushed to client");
    }
}

fn starter_kit() -> InMemoryInventory {
    InMemoryInventory::new()
        .with_container(
            ContainerKind::Hotbar,
            vec![
                Some(ItemStack::new("game:axe-flint", 1).with_durability(120)),
                Some(ItemStack::new("game:torch", 8)),
                None,
            ],
        )
        .with_container(
            ContainerKind::Backpack,
            vec![Some(ItemStack::new("game:flaxfibers", 12)), None],
        )
}

fn show(who: &IdentityKey, command: &str, reply: &CommandReply) {
    tracing::info!(identity = %who, command, code = reply.code(), "{}", reply.message);
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => WardenConfig::load(path),
        None => WardenConfig::default(),
    };
    // Short enough to watch happen.
    config.kick_unauthenticated_after_ms = 1_500;

    let world = Arc::new(SandboxWorld::default());
    let warden = WardenBuilder::new()
        .config(config)
        .build(Arc::clone(&world), MemoryBlobStore::new())?;
    let background = warden.spawn_background();
    let spawn = Position::new(512.0, 110.0, 512.0);

    // alice: no account yet, registers.
    let alice = IdentityKey::from("alice");
    world.spawn(&alice, spawn, starter_kit());
    warden.on_connect(&alice).await;
    warden.on_world_ready(&alice);
    show(&alice, "register", &warden.register(&alice, Some("correct horse")).await);

    // bob: has an account, fumbles once, then logs in.
    let bob = IdentityKey::from("bob");
    warden.credentials().register(&bob, "hunter2").await?;
    world.spawn(&bob, spawn, starter_kit());
    warden.on_connect(&bob).await;
    warden.on_world_ready(&bob);
    tracing::info!(identity = %bob, items = world.occupied(&bob), "live items while frozen");

    let verdict = warden.allow_block_break(&bob, BlockPos::new(510, 109, 512), "game:soil-medium");
    tracing::info!(identity = %bob, allowed = verdict.is_allowed(), "block break");
    world.walk(&bob, Position::new(530.0, 110.0, 498.0));
    tokio::time::sleep(Duration::from_millis(250)).await;

    show(&bob, "login", &warden.login(&bob, Some("hunter3")).await);
    show(&bob, "login", &warden.login(&bob, Some("hunter2")).await);
    tracing::info!(identity = %bob, items = world.occupied(&bob), "live items after login");
    show(&bob, "changepassword", &warden.change_password(&bob, Some("tr0ub4dor")).await);

    // mallory: has an account, never logs in.
    let mallory = IdentityKey::from("mallory");
    warden.credentials().register(&mallory, "letmein").await?;
    world.spawn(&mallory, spawn, starter_kit());
    warden.on_connect(&mallory).await;
    warden.on_world_ready(&mallory);
    tokio::time::sleep(Duration::from_millis(1_600)).await;
    warden.on_disconnect(&mallory).await;
    tracing::info!(identity = %mallory, items = world.occupied(&mallory), "items returned before save");
    world.despawn(&mallory);

    show(
        &alice,
        "forcechangepassword",
        &warden.force_change_password(Some("mallory"), Some("reset-me")).await,
    );

    for who in [&alice, &bob] {
        warden.on_disconnect(who).await;
        world.despawn(who);
    }
    background.shutdown().await;
    Ok(())
}
