//! Integration tests for the gatekeeper: connection lifecycle, commands,
//! the action gate, and the timed follow-ups.
//!
//! Time-dependent tests run on paused Tokio time, so the 20 s grace kick
//! or the 1 s deferred freeze fire as soon as the test sleeps past them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use warden::freeze::InMemoryInventory;
use warden::prelude::*;
use warden::session::{AttemptKind, HashParams, StoreError};

// =========================================================================
// Mock host
// =========================================================================

struct Player {
    name: String,
    position: Position,
    inventory: InMemoryInventory,
    alive: bool,
}

/// An in-memory host that records every side effect Warden asks for.
///
/// `disconnect` only records the request; tests call `on_disconnect` and
/// `leave` themselves, like a real host's event dispatch would.
#[derive(Default)]
struct MockHost {
    players: Mutex<HashMap<IdentityKey, Player>>,
    teleports: Mutex<Vec<(IdentityKey, Position)>>,
    disconnects: Mutex<Vec<(IdentityKey, String)>>,
    messages: Mutex<Vec<(IdentityKey, String)>>,
    placed: Mutex<Vec<(BlockPos, String)>>,
    synced: Mutex<Vec<IdentityKey>>,
}

impl MockHost {
    fn join(&self, id: &str, name: &str, position: Position, inventory: InMemoryInventory) {
        self.players.lock().insert(
            IdentityKey::from(id),
            Player {
                name: name.to_owned(),
                position,
                inventory,
                alive: true,
            },
        );
    }

    fn leave(&self, id: &IdentityKey) {
        self.players.lock().remove(id);
    }

    fn walk(&self, id: &IdentityKey, position: Position) {
        if let Some(p) = self.players.lock().get_mut(id) {
            p.position = position;
        }
    }

    fn set_alive(&self, id: &IdentityKey, alive: bool) {
        if let Some(p) = self.players.lock().get_mut(id) {
            p.alive = alive;
        }
    }

    fn inventory(&self, id: &IdentityKey) -> InMemoryInventory {
        self.players.lock()[id].inventory.clone()
    }

    fn current_position(&self, id: &IdentityKey) -> Position {
        self.players.lock()[id].position
    }

    fn disconnect_reasons(&self, id: &IdentityKey) -> Vec<String> {
        self.disconnects
            .lock()
            .iter()
            .filter(|(who, _)| who == id)
            .map(|(_, reason)| reason.clone())
            .collect()
    }

    fn last_message(&self, id: &IdentityKey) -> Option<String> {
        self.messages
            .lock()
            .iter()
            .rev()
            .find(|(who, _)| who == id)
            .map(|(_, m)| m.clone())
    }
}

impl Host for MockHost {
    fn is_online(&self, identity: &IdentityKey) -> bool {
        self.players.lock().contains_key(identity)
    }

    fn identities_named(&self, name: &str) -> Vec<IdentityKey> {
        self.players
            .lock()
            .iter()
            .filter(|(_, p)| p.name == name)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn position(&self, identity: &IdentityKey) -> Option<Position> {
        self.players.lock().get(identity).map(|p| p.position)
    }

    fn teleport(&self, identity: &IdentityKey, position: Position) {
        if let Some(p) = self.players.lock().get_mut(identity) {
            p.position = position;
        }
        self.teleports.lock().push((identity.clone(), position));
    }

    fn disconnect(&self, identity: &IdentityKey, reason: &str) {
        self.disconnects
            .lock()
            .push((identity.clone(), reason.to_owned()));
    }

    fn send_message(&self, identity: &IdentityKey, message: &str) {
        self.messages
            .lock()
            .push((identity.clone(), message.to_owned()));
    }

    fn with_inventory<R>(
        &self,
        identity: &IdentityKey,
        f: impl FnOnce(&mut dyn PlayerInventory) -> R,
    ) -> Option<R> {
        let mut players = self.players.lock();
        let player = players.get_mut(identity)?;
        Some(f(&mut player.inventory))
    }

    fn is_alive(&self, identity: &IdentityKey) -> bool {
        self.players
            .lock()
            .get(identity)
            .is_some_and(|p| p.alive)
    }

    fn place_block(&self, pos: BlockPos, block: &str) {
        self.placed.lock().push((pos, block.to_owned()));
    }

    fn sync_inventory(&self, identity: &IdentityKey) {
        self.synced.lock().push(identity.clone());
    }
}

// =========================================================================
// Helpers
// =========================================================================

type TestWarden = Warden<MockHost, MemoryBlobStore>;

fn fast_config() -> WardenConfig {
    WardenConfig {
        // Cheapest parameters argon2 accepts.
        password_hashing: HashParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        ..WardenConfig::default()
    }
}

fn setup_with(config: WardenConfig) -> (TestWarden, Arc<MockHost>) {
    let host = Arc::new(MockHost::default());
    let warden = WardenBuilder::new()
        .config(config)
        .build(Arc::clone(&host), MemoryBlobStore::new())
        .unwrap();
    (warden, host)
}

fn setup() -> (TestWarden, Arc<MockHost>) {
    setup_with(fast_config())
}

fn id(name: &str) -> IdentityKey {
    IdentityKey::from(name)
}

fn spawn_point() -> Position {
    Position::new(512.0, 110.0, 512.0)
}

fn kit() -> InMemoryInventory {
    InMemoryInventory::new()
        .with_container(
            ContainerKind::Hotbar,
            vec![
                Some(ItemStack::new("game:pickaxe-iron", 1).with_durability(300)),
                None,
                Some(ItemStack::new("game:torch", 16)),
            ],
        )
        .with_container(
            ContainerKind::Backpack,
            vec![Some(ItemStack::new("game:bread", 8)), None],
        )
        .with_container(
            ContainerKind::Character,
            vec![Some(ItemStack::new("game:helmet-leather", 1))],
        )
}

/// Registers `name` with `password` and connects it at the spawn point.
async fn connect_registered(warden: &TestWarden, host: &MockHost, name: &str, password: &str) {
    warden.credentials().register(&id(name), password).await.unwrap();
    host.join(name, name, spawn_point(), kit());
    warden.on_connect(&id(name)).await;
}

/// A blob store whose reads start failing on demand, like a host save
/// system that went away mid-session.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryBlobStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn fail_reads(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl BlobStore for FlakyStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("save system offline".into()));
        }
        self.inner.get(name).await
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.inner.put(name, data).await
    }
}

// =========================================================================
// Unregistered identities
// =========================================================================

#[tokio::test]
async fn test_unregistered_connect_is_not_gated_and_register_stores_hash() {
    let (warden, host) = setup();
    let alice = id("alice");
    host.join("alice", "alice", spawn_point(), kit());

    warden.on_connect(&alice).await;
    assert!(!warden.is_gated(&alice));
    assert_eq!(
        host.last_message(&alice).as_deref(),
        Some(warden.config().messages.register_prompt.as_str())
    );

    let reply = warden.register(&alice, Some("secret")).await;
    assert_eq!(reply.status, CommandStatus::Registered);
    assert_eq!(reply.code(), 8);

    let stored = warden.credentials().load().await;
    let record = &stored[&alice];
    assert_ne!(record, "secret");
    assert!(record.starts_with("$argon2id$"));

    let blob = warden
        .credentials()
        .backend()
        .snapshot(warden.credentials().blob_name())
        .unwrap();
    assert!(!String::from_utf8(blob).unwrap().contains("secret"));
}

#[tokio::test]
async fn test_register_missing_and_duplicate_report_codes() {
    let (warden, host) = setup();
    let alice = id("alice");
    host.join("alice", "alice", spawn_point(), kit());
    warden.on_connect(&alice).await;

    assert_eq!(warden.register(&alice, None).await.code(), 0);
    assert_eq!(warden.register(&alice, Some("   ")).await.code(), 0);
    assert_eq!(warden.register(&alice, Some("secret")).await.code(), 8);

    let again = warden.register(&alice, Some("other")).await;
    assert_eq!(again.status, CommandStatus::AlreadyRegistered);
    assert_eq!(again.message, warden.config().messages.already_registered);
}

#[tokio::test(start_paused = true)]
async fn test_freeze_unregistered_defers_capture_until_after_relocation() {
    let (warden, host) = setup_with(WardenConfig {
        freeze_unregistered: true,
        ..fast_config()
    });
    let carol = id("carol");
    // Joins at a placeholder edge-of-world position.
    host.join("carol", "carol", Position::new(0.0, 0.0, 0.0), kit());

    warden.on_connect(&carol).await;
    assert!(warden.is_gated(&carol));
    assert!(!warden.vault().is_frozen(&carol), "freeze waits for world-ready");

    warden.on_world_ready(&carol);
    host.walk(&carol, spawn_point());
    tokio::time::sleep(Duration::from_millis(1_001)).await;

    assert!(warden.vault().is_frozen(&carol));
    assert_eq!(warden.vault().position(&carol), Some(spawn_point()));
    assert_eq!(host.inventory(&carol).occupied(), 0);

    let reply = warden.register(&carol, Some("pw")).await;
    assert_eq!(reply.status, CommandStatus::Registered);
    assert!(!warden.is_gated(&carol));
    assert_eq!(host.inventory(&carol), kit());
}

#[tokio::test(start_paused = true)]
async fn test_deferred_freeze_skipped_after_register() {
    let (warden, host) = setup_with(WardenConfig {
        freeze_unregistered: true,
        ..fast_config()
    });
    let carol = id("carol");
    host.join("carol", "carol", spawn_point(), kit());
    warden.on_connect(&carol).await;
    warden.on_world_ready(&carol);

    warden.register(&carol, Some("pw")).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(!warden.vault().is_frozen(&carol));
    assert_eq!(host.inventory(&carol), kit());
}

#[tokio::test]
async fn test_gated_unregistered_login_reports_not_registered() {
    let (warden, host) = setup_with(WardenConfig {
        freeze_unregistered: true,
        ..fast_config()
    });
    let carol = id("carol");
    host.join("carol", "carol", spawn_point(), kit());
    warden.on_connect(&carol).await;

    let reply = warden.login(&carol, Some("anything")).await;
    assert_eq!(reply.status, CommandStatus::NotRegistered);
    assert_eq!(warden.attempts().count(&carol, AttemptKind::Login), 0);
}

#[tokio::test]
async fn test_unregistered_disconnect_discards_snapshot() {
    let (warden, host) = setup_with(WardenConfig {
        freeze_unregistered: true,
        ..fast_config()
    });
    let carol = id("carol");
    host.join("carol", "carol", spawn_point(), kit());
    warden.on_connect(&carol).await;
    // Capture directly, as the deferred freeze would.
    host.with_inventory(&carol, |inv| warden.vault().capture(&carol, spawn_point(), inv));

    warden.on_disconnect(&carol).await;

    assert!(!warden.vault().is_frozen(&carol));
    assert!(!warden.is_gated(&carol));
    assert_eq!(host.inventory(&carol).occupied(), 0, "nothing is restored");
}

// =========================================================================
// Registered identities
// =========================================================================

#[tokio::test]
async fn test_registered_connect_gates_and_freezes() {
    let (warden, host) = setup();
    let bob = id("bob");

    connect_registered(&warden, &host, "bob", "hunter2").await;

    assert!(warden.is_gated(&bob));
    assert_eq!(warden.vault().position(&bob), Some(spawn_point()));
    assert_eq!(warden.vault().get(&bob).unwrap().item_count(), 4);
    assert_eq!(host.inventory(&bob).occupied(), 0);
    assert_eq!(
        host.last_message(&bob).as_deref(),
        Some(warden.config().messages.login_prompt.as_str())
    );
}

#[tokio::test]
async fn test_wrong_logins_count_then_disconnect_on_fifth() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    let first = warden.login(&bob, Some("wrong")).await;
    assert_eq!(first.status, CommandStatus::InvalidCredential);
    assert_eq!(warden.attempts().count(&bob, AttemptKind::Login), 1);

    for _ in 0..3 {
        let reply = warden.login(&bob, Some("wrong")).await;
        assert_eq!(reply.status, CommandStatus::InvalidCredential);
    }
    assert!(host.disconnect_reasons(&bob).is_empty());

    let fifth = warden.login(&bob, Some("wrong")).await;
    assert_eq!(fifth.status, CommandStatus::TooManyAttempts);
    assert_eq!(
        host.disconnect_reasons(&bob),
        vec![warden.config().messages.too_many_attempts.clone()]
    );
    assert!(warden.is_gated(&bob), "still gated until the host disconnects");
}

#[tokio::test]
async fn test_login_restores_inventory_and_releases() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    let reply = warden.login(&bob, Some("hunter2")).await;

    assert_eq!(reply.status, CommandStatus::LoggedIn);
    assert_eq!(reply.message, "Successfully logged");
    assert!(!warden.is_gated(&bob));
    assert!(!warden.vault().is_frozen(&bob));
    assert_eq!(host.inventory(&bob), kit());
    assert_eq!(*host.synced.lock(), vec![bob.clone()]);
}

#[tokio::test]
async fn test_login_when_not_gated_is_already_authenticated() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    warden.login(&bob, Some("hunter2")).await;

    let again = warden.login(&bob, Some("hunter2")).await;
    assert_eq!(again.status, CommandStatus::AlreadyAuthenticated);

    let missing = warden.login(&id("bob"), None).await;
    assert_eq!(missing.code(), 10, "gate state is checked before the argument");
}

#[tokio::test]
async fn test_login_missing_password_is_code_zero() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    let reply = warden.login(&bob, Some("")).await;
    assert_eq!(reply.code(), 0);
    assert_eq!(warden.attempts().count(&bob, AttemptKind::Login), 0);
}

#[tokio::test]
async fn test_disconnect_while_gated_restores_then_reconnect_recaptures() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    warden.on_disconnect(&bob).await;
    assert_eq!(host.inventory(&bob), kit(), "items back before the host saves");
    assert!(!warden.is_gated(&bob));
    assert!(warden.vault().is_empty());
    host.leave(&bob);

    // Comes back somewhere else with a different kit.
    let elsewhere = Position::new(-40.0, 72.0, 9.5);
    let lighter = InMemoryInventory::new()
        .with_container(ContainerKind::Hotbar, vec![Some(ItemStack::new("game:stick", 3))]);
    host.join("bob", "bob", elsewhere, lighter.clone());
    warden.on_connect(&bob).await;

    assert!(warden.is_gated(&bob));
    assert_eq!(warden.vault().position(&bob), Some(elsewhere));
    warden.login(&bob, Some("hunter2")).await;
    assert_eq!(host.inventory(&bob), lighter);
}

#[tokio::test]
async fn test_disconnect_during_store_outage_still_restores() {
    let host = Arc::new(MockHost::default());
    let warden = WardenBuilder::new()
        .config(fast_config())
        .build(Arc::clone(&host), FlakyStore::default())
        .unwrap();
    let bob = id("bob");
    warden.credentials().register(&bob, "hunter2").await.unwrap();
    host.join("bob", "bob", spawn_point(), kit());
    warden.on_connect(&bob).await;
    assert!(warden.vault().is_frozen(&bob));

    warden.credentials().backend().fail_reads();
    warden.on_disconnect(&bob).await;

    assert!(!warden.vault().is_frozen(&bob));
    assert_eq!(host.inventory(&bob), kit(), "items must survive the outage");
}

#[tokio::test]
async fn test_connect_discards_orphaned_snapshot() {
    let (warden, host) = setup();
    let bob = id("bob");
    warden.credentials().register(&bob, "hunter2").await.unwrap();
    let mut old = kit();
    warden.vault().capture(&bob, Position::new(1.0, 2.0, 3.0), &mut old);

    host.join("bob", "bob", spawn_point(), kit());
    warden.on_connect(&bob).await;

    assert_eq!(warden.vault().position(&bob), Some(spawn_point()));
    assert_eq!(warden.vault().get(&bob).unwrap().item_count(), 4);
}

#[tokio::test]
async fn test_connect_twice_keeps_single_session() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    warden.on_connect(&bob).await;

    assert_eq!(warden.sessions().len(), 1);
    assert_eq!(warden.attempts().count(&bob, AttemptKind::Join), 2);
    assert_eq!(
        warden.vault().get(&bob).unwrap().item_count(),
        4,
        "original snapshot survives"
    );
}

#[tokio::test]
async fn test_connect_dead_sets_dead_flag() {
    let (warden, host) = setup();
    let bob = id("bob");
    warden.credentials().register(&bob, "hunter2").await.unwrap();
    host.join("bob", "bob", spawn_point(), kit());
    host.set_alive(&bob, false);

    warden.on_connect(&bob).await;

    assert!(warden.attempts().is_dead(&bob));
    assert_eq!(warden.enforce_positions(), 0);
}

// =========================================================================
// Attempt limits
// =========================================================================

#[tokio::test]
async fn test_fifth_join_within_window_is_kicked() {
    let (warden, host) = setup();
    let dave = id("dave");

    for _ in 0..4 {
        host.join("dave", "dave", spawn_point(), kit());
        warden.on_connect(&dave).await;
        warden.on_disconnect(&dave).await;
        host.leave(&dave);
    }
    assert!(host.disconnect_reasons(&dave).is_empty());

    host.join("dave", "dave", spawn_point(), kit());
    warden.on_connect(&dave).await;

    assert_eq!(host.disconnect_reasons(&dave), vec!["Too many attempts".to_owned()]);
}

#[tokio::test]
async fn test_over_limit_registered_connect_is_gated_while_kicked() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    for _ in 0..4 {
        warden.on_disconnect(&bob).await;
        host.leave(&bob);
        host.join("bob", "bob", spawn_point(), kit());
        warden.on_connect(&bob).await;
    }

    assert_eq!(host.disconnect_reasons(&bob), vec!["Too many attempts".to_owned()]);
    assert!(warden.is_gated(&bob));
    assert!(warden.vault().is_frozen(&bob));
    assert_eq!(host.inventory(&bob).occupied(), 0);
    assert!(!warden.allow_block_place(&bob, BlockPos::new(4, 64, 4)).is_allowed());

    // The host's disconnect event hands the items back.
    warden.on_disconnect(&bob).await;
    assert_eq!(host.inventory(&bob), kit());
}

#[tokio::test]
async fn test_decay_lowers_counters_and_reopens_login() {
    let (warden, host) = setup_with(WardenConfig {
        max_attempts: 2,
        ..fast_config()
    });
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    warden.login(&bob, Some("wrong")).await;
    warden.login(&bob, Some("wrong")).await;
    assert!(warden.attempts().should_disconnect(&bob));

    warden.decay_attempts();
    assert_eq!(warden.attempts().count(&bob, AttemptKind::Login), 1);

    let reply = warden.login(&bob, Some("hunter2")).await;
    assert_eq!(reply.status, CommandStatus::LoggedIn);
}

#[tokio::test]
async fn test_shared_counter_joins_and_logins_reach_threshold_together() {
    let (warden, host) = setup_with(WardenConfig {
        shared_attempt_counter: true,
        max_attempts: 3,
        ..fast_config()
    });
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    assert_eq!(warden.login(&bob, Some("x")).await.code(), 3);
    let reply = warden.login(&bob, Some("x")).await;

    assert_eq!(reply.status, CommandStatus::TooManyAttempts);
}

// =========================================================================
// Password changes
// =========================================================================

#[tokio::test]
async fn test_change_password_requires_authentication() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    let gated = warden.change_password(&bob, Some("new")).await;
    assert_eq!(gated.status, CommandStatus::NotAuthenticated);

    warden.login(&bob, Some("hunter2")).await;
    assert_eq!(warden.change_password(&bob, None).await.code(), 0);
    let changed = warden.change_password(&bob, Some("new")).await;
    assert_eq!(changed.code(), 4);

    assert!(warden.credentials().verify(&bob, "new").await.is_ok());
    assert!(warden.credentials().verify(&bob, "hunter2").await.is_err());
}

#[tokio::test]
async fn test_force_change_password_malformed_args() {
    let (warden, _host) = setup();

    assert_eq!(warden.force_change_password(None, Some("pw")).await.code(), 5);
    assert_eq!(warden.force_change_password(Some("bob"), None).await.code(), 7);
}

#[tokio::test]
async fn test_force_change_password_by_exact_key_works_offline() {
    let (warden, _host) = setup();
    let bob = id("bob");
    warden.credentials().register(&bob, "hunter2").await.unwrap();

    let reply = warden.force_change_password(Some("bob"), Some("reset")).await;

    assert_eq!(reply.code(), 6);
    assert!(warden.credentials().verify(&bob, "reset").await.is_ok());
}

#[tokio::test]
async fn test_force_change_password_resolves_display_name_in_stable_id_mode() {
    let (warden, host) = setup_with(WardenConfig {
        addressing: AddressingMode::StableId,
        ..fast_config()
    });
    let uid = id("8f0c-22aa");
    warden.credentials().register(&uid, "hunter2").await.unwrap();
    host.join("8f0c-22aa", "Sam", spawn_point(), kit());

    let reply = warden.force_change_password(Some("Sam"), Some("reset")).await;

    assert_eq!(reply.status, CommandStatus::AdminPasswordChanged);
    assert!(warden.credentials().verify(&uid, "reset").await.is_ok());
}

#[tokio::test]
async fn test_force_change_password_ambiguous_and_unknown() {
    let (warden, host) = setup_with(WardenConfig {
        addressing: AddressingMode::StableId,
        ..fast_config()
    });
    host.join("uid-1", "Sam", spawn_point(), kit());
    host.join("uid-2", "Sam", spawn_point(), kit());

    let ambiguous = warden.force_change_password(Some("Sam"), Some("pw")).await;
    assert_eq!(ambiguous.status, CommandStatus::AmbiguousIdentity);
    assert_eq!(ambiguous.code(), 13);

    let unknown = warden.force_change_password(Some("Nobody"), Some("pw")).await;
    assert_eq!(unknown.status, CommandStatus::UnknownIdentity);
}

#[tokio::test]
async fn test_force_change_password_unregistered_target_is_not_registered() {
    let (warden, host) = setup();
    host.join("erin", "erin", spawn_point(), kit());

    let reply = warden.force_change_password(Some("erin"), Some("pw")).await;

    assert_eq!(reply.status, CommandStatus::NotRegistered);
}

// =========================================================================
// Action gate
// =========================================================================

#[tokio::test]
async fn test_gate_denies_gated_actions_except_login_and_register() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    let pos = BlockPos::new(10, 64, -3);

    assert!(warden.allow_command(&bob, "/login hunter2").is_allowed());
    assert!(warden.allow_command(&bob, "REGISTER pw").is_allowed());
    assert!(!warden.allow_command(&bob, "/home").is_allowed());
    assert!(!warden.allow_command(&bob, "/loginx").is_allowed());
    assert!(!warden.allow_inventory_access(&bob).is_allowed());
    assert!(!warden.allow_block_place(&bob, pos).is_allowed());
    assert!(!warden.allow_damage(Some(&bob), None).is_allowed());
    assert!(!warden.allow_damage(None, Some(&bob)).is_allowed());
    assert!(!warden.allow_durability_loss(&bob).is_allowed());

    let denied = warden.allow_hunger_loss(&bob);
    assert_eq!(denied.message(), Some(warden.config().messages.action_denied.as_str()));

    warden.login(&bob, Some("hunter2")).await;

    assert!(warden.allow_command(&bob, "/home").is_allowed());
    assert!(warden.allow_inventory_access(&bob).is_allowed());
    assert!(warden.allow_block_place(&bob, pos).is_allowed());
    assert!(warden.allow_damage(Some(&bob), Some(&id("zombie"))).is_allowed());
    assert_eq!(warden.allow_hunger_loss(&bob), Verdict::Allow);
}

#[tokio::test(start_paused = true)]
async fn test_denied_block_break_replaces_block_after_delay() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    let pos = BlockPos::new(1, 2, 3);

    let verdict = warden.allow_block_break(&bob, pos, "game:rock-granite");
    assert!(!verdict.is_allowed());
    assert!(host.placed.lock().is_empty(), "placement is delayed");

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(*host.placed.lock(), vec![(pos, "game:rock-granite".to_owned())]);
}

#[tokio::test(start_paused = true)]
async fn test_block_break_undo_disabled_only_vetoes() {
    let (warden, host) = setup_with(WardenConfig {
        block_break_undo_ms: 0,
        ..fast_config()
    });
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    let verdict = warden.allow_block_break(&bob, BlockPos::new(0, 0, 0), "game:soil");
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!verdict.is_allowed());
    assert!(host.placed.lock().is_empty());
}

#[tokio::test]
async fn test_allowed_block_break_places_nothing() {
    let (warden, host) = setup();
    let alice = id("alice");
    host.join("alice", "alice", spawn_point(), kit());
    warden.on_connect(&alice).await;

    assert!(warden.allow_block_break(&alice, BlockPos::new(0, 0, 0), "game:soil").is_allowed());
    tokio::task::yield_now().await;
    assert!(host.placed.lock().is_empty());
}

#[test]
fn test_denied_block_break_outside_runtime_is_plain_veto() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (warden, host) = setup();
    let bob = id("bob");
    runtime.block_on(connect_registered(&warden, &host, "bob", "hunter2"));

    // Host thread with no runtime context.
    let verdict = warden.allow_block_break(&bob, BlockPos::new(1, 2, 3), "game:rock-granite");

    assert!(!verdict.is_allowed());
    assert!(host.placed.lock().is_empty());
}

// =========================================================================
// Grace-timeout kick
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_unauthenticated_identity_kicked_after_grace_period() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    warden.on_world_ready(&bob);

    tokio::time::sleep(Duration::from_millis(19_900)).await;
    assert!(host.disconnect_reasons(&bob).is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(host.disconnect_reasons(&bob), vec!["Login timeout".to_owned()]);
    assert!(warden.is_gated(&bob), "gated until the host's disconnect event");
    assert_eq!(warden.attempts().count(&bob, AttemptKind::Join), 2);

    // The host's disconnect event returns the items and ends the session.
    warden.on_disconnect(&bob).await;
    assert!(!warden.is_gated(&bob));
    assert_eq!(host.inventory(&bob), kit());
}

#[tokio::test(start_paused = true)]
async fn test_kicked_identity_cannot_act_before_host_disconnects() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    warden.on_world_ready(&bob);
    tokio::time::sleep(Duration::from_secs(21)).await;
    assert_eq!(host.disconnect_reasons(&bob).len(), 1);
    assert!(host.is_online(&bob), "host hasn't torn the connection down yet");

    assert!(!warden.allow_command(&bob, "/changepassword pwned").is_allowed());
    assert!(!warden.allow_inventory_access(&bob).is_allowed());
    let reply = warden.change_password(&bob, Some("pwned")).await;
    assert_eq!(reply.status, CommandStatus::NotAuthenticated);
    assert!(warden.credentials().verify(&bob, "hunter2").await.is_ok());
    assert_eq!(host.inventory(&bob).occupied(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_logged_in_identity_is_not_kicked() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    warden.on_world_ready(&bob);

    warden.login(&bob, Some("hunter2")).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(host.disconnect_reasons(&bob).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_grace_kick_ignores_newer_session_after_reconnect() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    warden.on_world_ready(&bob);

    tokio::time::sleep(Duration::from_secs(10)).await;
    warden.on_disconnect(&bob).await;
    warden.on_connect(&bob).await;
    warden.on_world_ready(&bob);

    // First timer fires at 20 s and must leave the new session alone.
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert!(host.disconnect_reasons(&bob).is_empty());
    assert!(warden.is_gated(&bob));

    // The new session's own timer fires at 30 s.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(host.disconnect_reasons(&bob).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_grace_kick_skips_identity_already_gone() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    warden.on_world_ready(&bob);
    host.leave(&bob);

    tokio::time::sleep(Duration::from_secs(25)).await;

    assert!(host.disconnect_reasons(&bob).is_empty());
}

// =========================================================================
// Position enforcement
// =========================================================================

#[tokio::test]
async fn test_enforce_positions_pins_frozen_identities() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    host.walk(&bob, Position::new(600.0, 110.0, 512.0));

    assert_eq!(warden.enforce_positions(), 1);

    assert_eq!(host.current_position(&bob), spawn_point());
    assert_eq!(*host.teleports.lock(), vec![(bob.clone(), spawn_point())]);
}

#[tokio::test]
async fn test_enforce_positions_empty_and_offline_are_noops() {
    let (warden, host) = setup();
    assert_eq!(warden.enforce_positions(), 0);

    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    host.leave(&bob);

    assert_eq!(warden.enforce_positions(), 0);
    assert!(host.teleports.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dead_identity_not_pinned_until_revive_grace_ends() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    warden.on_death(&bob);
    assert_eq!(warden.enforce_positions(), 0);

    warden.on_respawn(&bob);
    tokio::time::sleep(Duration::from_millis(2_900)).await;
    assert_eq!(warden.enforce_positions(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!warden.attempts().is_dead(&bob));
    assert_eq!(warden.enforce_positions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_revive_timer_keeps_later_death_flag() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;

    host.set_alive(&bob, false);
    warden.on_death(&bob);
    host.set_alive(&bob, true);
    warden.on_respawn(&bob);

    // Dies again inside the first revive grace.
    tokio::time::sleep(Duration::from_secs(1)).await;
    host.set_alive(&bob, false);
    warden.on_death(&bob);

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(warden.attempts().is_dead(&bob));
    assert_eq!(warden.enforce_positions(), 0);
    assert!(host.teleports.lock().is_empty());

    // The second respawn's own grace clears it.
    host.set_alive(&bob, true);
    warden.on_respawn(&bob);
    tokio::time::sleep(Duration::from_millis(3_100)).await;
    assert!(!warden.attempts().is_dead(&bob));
    assert_eq!(warden.enforce_positions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_loops_pin_and_decay_until_shutdown() {
    let (warden, host) = setup();
    let bob = id("bob");
    connect_registered(&warden, &host, "bob", "hunter2").await;
    warden.login(&bob, Some("wrong")).await;

    let background = warden.spawn_background();
    host.walk(&bob, Position::new(0.0, 0.0, 0.0));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(host.current_position(&bob), spawn_point());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(warden.attempts().count(&bob, AttemptKind::Login), 0);

    background.shutdown().await;
    let teleports = host.teleports.lock().len();
    host.walk(&bob, Position::new(0.0, 0.0, 0.0));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(host.teleports.lock().len(), teleports);
}
