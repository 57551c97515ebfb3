//! The command surface: `register`, `login`, `changepassword`, and
//! `forcechangepassword`.
//!
//! Every command returns a [`CommandReply`]. Failures are replies too,
//! built from [`AuthError::status`] and the configured message for that
//! status; nothing here is a server fault.

use warden_protocol::{AddressingMode, CommandReply, CommandStatus, IdentityKey};
use warden_session::{AttemptKind, AuthError, BlobStore};

use crate::{Host, Messages, Warden};

/// `None` for a missing or blank argument.
fn argument(arg: Option<&str>) -> Option<&str> {
    arg.map(str::trim).filter(|a| !a.is_empty())
}

impl Messages {
    /// The configured line for a status.
    pub fn for_status(&self, status: CommandStatus) -> &str {
        match status {
            CommandStatus::MissingArgument => &self.missing_password,
            CommandStatus::AlreadyRegistered => &self.already_registered,
            CommandStatus::NotRegistered => &self.not_registered,
            CommandStatus::InvalidCredential => &self.invalid_password,
            CommandStatus::PasswordChanged => &self.password_changed,
            CommandStatus::MalformedAdminTarget => &self.malformed_admin_target,
            CommandStatus::AdminPasswordChanged => &self.admin_password_changed,
            CommandStatus::MalformedAdminPassword => &self.malformed_admin_password,
            CommandStatus::Registered => &self.registered,
            CommandStatus::LoggedIn => &self.logged_in,
            CommandStatus::AlreadyAuthenticated => &self.already_authenticated,
            CommandStatus::TooManyAttempts => &self.too_many_attempts,
            CommandStatus::NotAuthenticated => &self.change_without_login,
            CommandStatus::AmbiguousIdentity => &self.ambiguous_identity,
            CommandStatus::UnknownIdentity => &self.unknown_identity,
            CommandStatus::StorageFailure => &self.storage_failure,
        }
    }
}

impl<H: Host, B: BlobStore> Warden<H, B> {
    fn reply(&self, status: CommandStatus) -> CommandReply {
        CommandReply::new(status, self.inner.config.messages.for_status(status))
    }

    fn reply_err(&self, err: &AuthError) -> CommandReply {
        if matches!(err, AuthError::Hash(_) | AuthError::Storage(_)) {
            tracing::error!(error = %err, "credential storage failed");
        }
        self.reply(err.status())
    }

    /// `register <password>`.
    ///
    /// Stores a new credential. If the identity was gated by the
    /// unregistered-freeze policy it is released and its inventory
    /// restored.
    pub async fn register(&self, identity: &IdentityKey, password: Option<&str>) -> CommandReply {
        let Some(password) = argument(password) else {
            return self.reply(CommandStatus::MissingArgument);
        };
        if let Err(e) = self.inner.credentials.register(identity, password).await {
            tracing::debug!(%identity, error = %e, "register rejected");
            return self.reply_err(&e);
        }

        tracing::info!(%identity, "identity registered");
        self.unfreeze(identity);
        self.reply(CommandStatus::Registered)
    }

    /// `login <password>`.
    ///
    /// A wrong password counts one login failure; reaching the threshold
    /// disconnects the identity.
    pub async fn login(&self, identity: &IdentityKey, password: Option<&str>) -> CommandReply {
        let state = &self.inner;
        if !state.sessions.is_gated(identity) {
            return self.reply(CommandStatus::AlreadyAuthenticated);
        }
        let Some(password) = argument(password) else {
            return self.reply(CommandStatus::MissingArgument);
        };
        if state.attempts.should_disconnect(identity) {
            return self.too_many_attempts(identity);
        }

        match state.credentials.verify(identity, password).await {
            Ok(()) => {
                tracing::info!(%identity, "identity logged in");
                self.unfreeze(identity);
                self.reply(CommandStatus::LoggedIn)
            }
            Err(AuthError::InvalidCredential) => {
                let count = state.attempts.record_failure(identity, AttemptKind::Login);
                tracing::warn!(%identity, count, "wrong password");
                if state.attempts.should_disconnect(identity) {
                    return self.too_many_attempts(identity);
                }
                self.reply(CommandStatus::InvalidCredential)
            }
            Err(e) => self.reply_err(&e),
        }
    }

    /// `changepassword <password>`. Requires an authenticated session.
    pub async fn change_password(
        &self,
        identity: &IdentityKey,
        password: Option<&str>,
    ) -> CommandReply {
        if self.inner.sessions.is_gated(identity) {
            return self.reply(CommandStatus::NotAuthenticated);
        }
        let Some(password) = argument(password) else {
            return self.reply(CommandStatus::MissingArgument);
        };
        match self.inner.credentials.set_password(identity, password).await {
            Ok(()) => {
                tracing::info!(%identity, "password changed");
                self.reply(CommandStatus::PasswordChanged)
            }
            Err(e) => self.reply_err(&e),
        }
    }

    /// `forcechangepassword <target> <password>`.
    ///
    /// Privileged; the host's dispatcher checks the caller. Bypasses the
    /// authenticated-session check. `target` is an exact credential key or
    /// the display name of exactly one connected participant.
    pub async fn force_change_password(
        &self,
        target: Option<&str>,
        password: Option<&str>,
    ) -> CommandReply {
        let Some(target) = argument(target) else {
            return self.reply(CommandStatus::MalformedAdminTarget);
        };
        let Some(password) = argument(password) else {
            return self.reply(CommandStatus::MalformedAdminPassword);
        };

        let identity = match self.resolve_target(target).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(admin_target = target, error = %e, "admin target unresolved");
                return self.reply_err(&e);
            }
        };
        match self.inner.credentials.set_password(&identity, password).await {
            Ok(()) => {
                tracing::info!(%identity, "password changed by admin");
                self.reply(CommandStatus::AdminPasswordChanged)
            }
            Err(e) => self.reply_err(&e),
        }
    }

    /// Exact credential key first, then a display-name lookup among
    /// connected participants.
    ///
    /// In display-name addressing the key IS the name, so several
    /// connected participants sharing it is ambiguous even when a record
    /// exists.
    pub async fn resolve_target(&self, target: &str) -> Result<IdentityKey, AuthError> {
        let mut named = self.inner.host.identities_named(target);
        if named.len() > 1 && self.inner.config.addressing == AddressingMode::DisplayName {
            return Err(AuthError::AmbiguousIdentity(target.to_owned()));
        }
        let exact = IdentityKey::from(target);
        if self.inner.credentials.contains(&exact).await {
            return Ok(exact);
        }
        match named.len() {
            0 => Err(AuthError::UnknownIdentity(target.to_owned())),
            1 => Ok(named.remove(0)),
            _ => Err(AuthError::AmbiguousIdentity(target.to_owned())),
        }
    }

    fn too_many_attempts(&self, identity: &IdentityKey) -> CommandReply {
        tracing::warn!(%identity, "too many attempts, disconnecting");
        let reply = self.reply(CommandStatus::TooManyAttempts);
        self.inner.host.disconnect(identity, &reply.message);
        reply
    }

    /// Releases the identity, then restores and resyncs its inventory.
    ///
    /// Release comes first: a deferred freeze that starts afterwards finds
    /// the identity ungated and backs off, and one already running holds
    /// the registry lock so release waits for its capture to land.
    fn unfreeze(&self, identity: &IdentityKey) {
        let state = &self.inner;
        state.sessions.release(identity);
        state.attempts.clear_dead(identity);

        let restored = state
            .host
            .with_inventory(identity, |inv| state.vault.restore(identity, inv))
            .flatten();
        if restored.is_some() {
            state.host.sync_inventory(identity);
        }
    }
}
