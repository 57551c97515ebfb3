//! Background loops independent of any single connection.
//!
//! - **Position enforcement** (every `position_enforce_ms`): teleports
//!   every frozen, alive, online identity back to its captured position.
//! - **Attempt decay** (every `attempt_decay_ms`): lowers every attempt
//!   counter by one.
//!
//! Both bodies are plain methods, so a host with its own tick can call
//! them directly instead of using [`Warden::spawn_background`].

use tokio::sync::watch;
use tokio::task::JoinHandle;
use warden_session::BlobStore;
use warden_tick::{TickConfig, TickScheduler};

use crate::{Host, Warden};

/// Handle to the loops started by [`Warden::spawn_background`].
///
/// Dropping the handle also stops both loops.
#[derive(Debug)]
pub struct BackgroundHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl BackgroundHandle {
    /// Stops both loops and waits for them to exit.
    pub async fn shutdown(self) {
        // Receivers may already be gone if a loop panicked.
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "background loop ended abnormally");
            }
        }
    }
}

impl<H: Host, B: BlobStore> Warden<H, B> {
    /// One pass of the position enforcement loop.
    ///
    /// Returns how many identities were teleported. Dead identities are
    /// skipped so the death screen isn't fought; identities that already
    /// left are skipped silently.
    pub fn enforce_positions(&self) -> usize {
        let state = &self.inner;
        if state.vault.is_empty() {
            return 0;
        }

        let mut teleported = 0;
        for (identity, position) in state.vault.pinned() {
            if state.attempts.is_dead(&identity) || !state.host.is_online(&identity) {
                continue;
            }
            state.host.teleport(&identity, position);
            teleported += 1;
        }
        tracing::trace!(teleported, "positions enforced");
        teleported
    }

    /// One pass of the attempt decay loop. Returns how many counters
    /// reached zero and were removed.
    pub fn decay_attempts(&self) -> usize {
        let removed = self.inner.attempts.decay();
        tracing::debug!(
            removed,
            remaining = self.inner.attempts.active_counters(),
            "attempt counters decayed"
        );
        removed
    }

    /// Starts both loops on the current Tokio runtime.
    pub fn spawn_background(&self) -> BackgroundHandle {
        let (shutdown, rx) = watch::channel(false);
        let config = &self.inner.config;

        let warden = self.clone();
        let enforce = tokio::spawn(run_loop(
            "position-enforcement",
            TickScheduler::new(TickConfig::every(config.position_enforce())),
            rx.clone(),
            move || {
                warden.enforce_positions();
            },
        ));

        let warden = self.clone();
        let decay = tokio::spawn(run_loop(
            "attempt-decay",
            TickScheduler::new(TickConfig::every(config.attempt_decay())),
            rx,
            move || {
                warden.decay_attempts();
            },
        ));

        tracing::info!(
            enforce_ms = config.position_enforce_ms,
            decay_ms = config.attempt_decay_ms,
            "background loops started"
        );
        BackgroundHandle {
            shutdown,
            tasks: vec![enforce, decay],
        }
    }
}

async fn run_loop(
    name: &'static str,
    mut scheduler: TickScheduler,
    mut shutdown: watch::Receiver<bool>,
    mut body: impl FnMut(),
) {
    if scheduler.is_disabled() {
        tracing::info!(task = name, "background loop disabled by zero period");
    }
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = scheduler.wait_for_tick() => {
                body();
                scheduler.record_tick_end();
            }
        }
    }
    tracing::debug!(
        task = name,
        ticks = scheduler.tick_count(),
        overruns = scheduler.metrics().total_overruns,
        "background loop stopped"
    );
}
