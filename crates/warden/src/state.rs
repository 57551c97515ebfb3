//! The injected state object and its builder.
//!
//! One [`Warden`] per running server. It owns every shared map (sessions,
//! snapshots, attempt counters, credentials) and is handed by reference
//! to every event handler instead of living in a global.

use std::sync::Arc;

use warden_freeze::FreezeVault;
use warden_protocol::IdentityKey;
use warden_session::{AttemptTracker, BlobStore, CredentialStore, SessionRegistry};

use crate::{Host, WardenConfig, WardenError};

/// Shared state behind every [`Warden`] clone.
///
/// Each map carries its own lock, so no component ever holds a reference
/// into another's map; coordination is by identity-key lookup.
pub(crate) struct WardenState<H: Host, B: BlobStore> {
    pub(crate) config: WardenConfig,
    pub(crate) host: Arc<H>,
    pub(crate) sessions: SessionRegistry,
    pub(crate) vault: FreezeVault,
    pub(crate) attempts: AttemptTracker,
    pub(crate) credentials: CredentialStore<B>,
}

/// Builder for configuring a [`Warden`].
///
/// # Example
///
/// ```rust,ignore
/// use warden::prelude::*;
///
/// let warden = WardenBuilder::new()
///     .config(WardenConfig::load("warden.json"))
///     .build(Arc::new(my_host), FileBlobStore::new("saves"))?;
/// let background = warden.spawn_background();
/// ```
#[derive(Debug, Clone, Default)]
pub struct WardenBuilder {
    config: WardenConfig,
}

impl WardenBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration. It is validated on [`build`](Self::build).
    pub fn config(mut self, config: WardenConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the gatekeeper around a host and a blob store.
    ///
    /// # Errors
    /// Fails if the configured password-hashing parameters are rejected.
    pub fn build<H: Host, B: BlobStore>(
        self,
        host: Arc<H>,
        store: B,
    ) -> Result<Warden<H, B>, WardenError> {
        let config = self.config.validated();
        let credentials = CredentialStore::new(
            store,
            config.addressing,
            config.credential_mode,
            config.password_hashing,
        )?;
        let attempts = AttemptTracker::new(config.max_attempts, config.shared_attempt_counter);

        tracing::info!(
            addressing = config.addressing.tag(),
            freeze_unregistered = config.freeze_unregistered,
            max_attempts = config.max_attempts,
            blob = credentials.blob_name(),
            "warden ready"
        );

        Ok(Warden {
            inner: Arc::new(WardenState {
                config,
                host,
                sessions: SessionRegistry::new(),
                vault: FreezeVault::new(),
                attempts,
                credentials,
            }),
        })
    }
}

/// The session-authentication gatekeeper.
///
/// Cheap to clone: every clone shares the same state. Event handlers live
/// in [`handler`](crate::handler), commands in [`commands`](crate::commands),
/// interception hooks in [`gate`](crate::gate), and the periodic loops in
/// [`runtime`](crate::runtime).
pub struct Warden<H: Host, B: BlobStore> {
    pub(crate) inner: Arc<WardenState<H, B>>,
}

impl<H: Host, B: BlobStore> Clone for Warden<H, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: Host, B: BlobStore> Warden<H, B> {
    pub fn config(&self) -> &WardenConfig {
        &self.inner.config
    }

    pub fn host(&self) -> &Arc<H> {
        &self.inner.host
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn vault(&self) -> &FreezeVault {
        &self.inner.vault
    }

    pub fn attempts(&self) -> &AttemptTracker {
        &self.inner.attempts
    }

    pub fn credentials(&self) -> &CredentialStore<B> {
        &self.inner.credentials
    }

    /// Shorthand for `sessions().is_gated(identity)`.
    pub fn is_gated(&self, identity: &IdentityKey) -> bool {
        self.inner.sessions.is_gated(identity)
    }
}
