//! Server-operator configuration.
//!
//! Read from a JSON file. Every field has a default, so a partial file
//! overrides only what it names:
//!
//! ```json
//! { "max_attempts": 3, "messages": { "login_prompt": "Log in first: /login <password>" } }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_protocol::AddressingMode;
use warden_session::{CredentialMode, HashParams};

use crate::ConfigError;

/// Gatekeeper configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Grace period after world-ready before an unauthenticated identity
    /// is kicked.
    pub kick_unauthenticated_after_ms: u64,
    /// Gate (and freeze) identities that have no credential yet.
    pub freeze_unregistered: bool,
    /// Failed attempts at which the connection is terminated.
    pub max_attempts: u32,
    /// Period of the attempt-counter decay loop.
    pub attempt_decay_ms: u64,
    /// Delay after world-ready before an unregistered identity is frozen.
    pub unregistered_freeze_delay_ms: u64,
    /// Delay after respawn before position pinning resumes.
    pub revive_grace_ms: u64,
    /// Period of the position enforcement loop.
    pub position_enforce_ms: u64,
    /// Delay before a vetoed block break is undone by re-placing the
    /// block. `0` turns the re-placement off.
    pub block_break_undo_ms: u64,
    /// Feed join and login failures into one counter.
    pub shared_attempt_counter: bool,
    pub addressing: AddressingMode,
    pub credential_mode: CredentialMode,
    pub password_hashing: HashParams,
    pub messages: Messages,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            kick_unauthenticated_after_ms: 20_000,
            freeze_unregistered: false,
            max_attempts: 5,
            attempt_decay_ms: 60_000,
            unregistered_freeze_delay_ms: 1_000,
            revive_grace_ms: 3_000,
            position_enforce_ms: 100,
            block_break_undo_ms: 50,
            shared_attempt_counter: false,
            addressing: AddressingMode::default(),
            credential_mode: CredentialMode::default(),
            password_hashing: HashParams::default(),
            messages: Messages::default(),
        }
    }
}

impl WardenConfig {
    /// Shortest accepted position enforcement period.
    pub const MIN_ENFORCE_MS: u64 = 10;

    /// Loads and validates the config at `path`.
    ///
    /// A missing or malformed file is logged at warn level and the
    /// defaults are used instead. The server still starts.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "could not read config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Loads and validates the config at `path`, surfacing failures.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Clamps values that would break the gatekeeper.
    ///
    /// - `max_attempts` is at least 1
    /// - a non-zero `position_enforce_ms` is at least [`Self::MIN_ENFORCE_MS`]
    pub fn validated(mut self) -> Self {
        if self.max_attempts == 0 {
            tracing::warn!("max_attempts is 0, clamping to 1");
            self.max_attempts = 1;
        }
        if self.position_enforce_ms != 0 && self.position_enforce_ms < Self::MIN_ENFORCE_MS {
            tracing::warn!(
                position_enforce_ms = self.position_enforce_ms,
                min_ms = Self::MIN_ENFORCE_MS,
                "position enforcement period below minimum, clamping"
            );
            self.position_enforce_ms = Self::MIN_ENFORCE_MS;
        }
        if self.attempt_decay_ms == 0 {
            tracing::warn!("attempt_decay_ms is 0, attempt counters will never decay");
        }
        self
    }

    pub fn kick_after(&self) -> Duration {
        Duration::from_millis(self.kick_unauthenticated_after_ms)
    }

    pub fn attempt_decay(&self) -> Duration {
        Duration::from_millis(self.attempt_decay_ms)
    }

    pub fn unregistered_freeze_delay(&self) -> Duration {
        Duration::from_millis(self.unregistered_freeze_delay_ms)
    }

    pub fn revive_grace(&self) -> Duration {
        Duration::from_millis(self.revive_grace_ms)
    }

    pub fn position_enforce(&self) -> Duration {
        Duration::from_millis(self.position_enforce_ms)
    }

    /// `None` when the block re-placement is turned off.
    pub fn block_break_undo(&self) -> Option<Duration> {
        (self.block_break_undo_ms != 0).then(|| Duration::from_millis(self.block_break_undo_ms))
    }
}

/// Every user-facing string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub register_prompt: String,
    pub login_prompt: String,
    pub registered: String,
    pub logged_in: String,
    pub password_changed: String,
    pub admin_password_changed: String,
    pub missing_password: String,
    pub already_registered: String,
    pub already_authenticated: String,
    pub not_registered: String,
    pub invalid_password: String,
    pub too_many_attempts: String,
    pub change_without_login: String,
    pub malformed_admin_target: String,
    pub malformed_admin_password: String,
    pub ambiguous_identity: String,
    pub unknown_identity: String,
    pub storage_failure: String,
    /// Denial for any gated gameplay action.
    pub action_denied: String,
    /// Kick reason when the grace period runs out.
    pub login_timeout: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            register_prompt: "This server is powered by authentication, consider protecting your account: /register password".into(),
            login_prompt: "To continue please login: /login password".into(),
            registered: "Successfully registered the account, next time you login in you will need the password".into(),
            logged_in: "Successfully logged".into(),
            password_changed: "Successfully changed your password".into(),
            admin_password_changed: "Successfully changed the player password".into(),
            missing_password: "Please type a password".into(),
            already_registered: "This account is already registered use /login password".into(),
            already_authenticated: "You are already logged".into(),
            not_registered: "This account is not registered yet, register using: /register password".into(),
            invalid_password: "Invalid password".into(),
            too_many_attempts: "Too many attempts".into(),
            change_without_login: "You cannot change the password without login in".into(),
            malformed_admin_target: "Please type the player name".into(),
            malformed_admin_password: "Please type the new password".into(),
            ambiguous_identity: "More than one player has that name, use their exact id".into(),
            unknown_identity: "No player or account matches that name".into(),
            storage_failure: "The server could not save your password, try again later".into(),
            action_denied: "To continue please login: /login password".into(),
            login_timeout: "Login timeout".into(),
        }
    }
}
