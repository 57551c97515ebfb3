//! The credential store: identity → password hash, kept as one blob.
//!
//! The whole map is loaded, changed, and written back on every mutation.
//! There is no partial update, so two writers racing through that cycle
//! would silently drop one of the changes (a registration lost to a
//! concurrent admin password reset). Every mutation therefore runs under
//! a single async lock around the full read-modify-write.
//!
//! # Blob layout
//!
//! ```text
//! { "format": 1, "passwords": { "alice": "$argon2id$v=19$...", ... } }
//! ```
//!
//! A bare `{ "alice": "secret" }` object is also accepted on read, which
//! is how deployments without a format tag stored their passwords.

use std::collections::BTreeMap;

use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use password_hash::SaltString;
use password_hash::rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task;
use warden_protocol::{AddressingMode, Codec, IdentityKey, JsonCodec, ProtocolError};

use crate::{AuthError, BlobStore, StoreError};

/// Current blob format tag.
pub const CREDENTIAL_FORMAT: u32 = 1;

/// Blob name prefix; the addressing mode tag is appended.
const BLOB_PREFIX: &str = "warden_passwords";

/// How passwords are written into the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// Salted argon2id PHC strings.
    #[default]
    Hashed,
    /// The literal password. Insecure; only for servers whose existing
    /// tooling reads the blob directly.
    LegacyPlaintext,
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CredentialBlob {
    Tagged {
        format: u32,
        passwords: BTreeMap<IdentityKey, String>,
    },
    Bare(BTreeMap<IdentityKey, String>),
}

/// Password records for one deployment.
pub struct CredentialStore<S: BlobStore, C: Codec = JsonCodec> {
    store: S,
    codec: C,
    blob_name: String,
    mode: CredentialMode,
    hasher: Argon2<'static>,
    /// Serializes every load-mutate-save cycle.
    write_lock: Mutex<()>,
}

impl<S: BlobStore> CredentialStore<S, JsonCodec> {
    /// Creates a store persisting through `store` as JSON.
    ///
    /// # Errors
    /// [`AuthError::Hash`] if `params` are outside argon2's accepted range.
    pub fn new(
        store: S,
        addressing: AddressingMode,
        mode: CredentialMode,
        params: HashParams,
    ) -> Result<Self, AuthError> {
        Self::with_codec(store, JsonCodec, addressing, mode, params)
    }
}

impl<S: BlobStore, C: Codec> CredentialStore<S, C> {
    /// Creates a store with an explicit codec.
    pub fn with_codec(
        store: S,
        codec: C,
        addressing: AddressingMode,
        mode: CredentialMode,
        params: HashParams,
    ) -> Result<Self, AuthError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Self {
            store,
            codec,
            blob_name: format!("{BLOB_PREFIX}.{}", addressing.tag()),
            mode,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            write_lock: Mutex::new(()),
        })
    }

    /// Name of the blob this store reads and writes.
    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    pub fn mode(&self) -> CredentialMode {
        self.mode
    }

    /// The underlying blob store.
    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Loads the full map.
    ///
    /// A store or decode failure yields an EMPTY map: the server keeps
    /// accepting players rather than locking everyone out. The failure is
    /// logged at warn level so an operator can see it.
    pub async fn load(&self) -> BTreeMap<IdentityKey, String> {
        match self.load_strict().await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    blob = %self.blob_name,
                    error = %e,
                    "credential blob unreadable, treating as empty"
                );
                BTreeMap::new()
            }
        }
    }

    /// Loads the full map, surfacing failures.
    ///
    /// Mutations use this instead of [`load`](Self::load): writing back an
    /// "empty because unreadable" map would erase every account.
    async fn load_strict(&self) -> Result<BTreeMap<IdentityKey, String>, StoreError> {
        let Some(bytes) = self.store.get(&self.blob_name).await? else {
            return Ok(BTreeMap::new());
        };
        match self.codec.decode::<CredentialBlob>(&bytes)? {
            CredentialBlob::Tagged { format, passwords } if format == CREDENTIAL_FORMAT => {
                Ok(passwords)
            }
            CredentialBlob::Tagged { format, .. } => {
                Err(ProtocolError::UnsupportedFormat(format).into())
            }
            CredentialBlob::Bare(passwords) => Ok(passwords),
        }
    }

    /// Writes the full map, replacing the blob.
    pub async fn save(&self, passwords: &BTreeMap<IdentityKey, String>) -> Result<(), StoreError> {
        let blob = CredentialBlob::Tagged {
            format: CREDENTIAL_FORMAT,
            passwords: passwords.clone(),
        };
        let bytes = self.codec.encode(&blob)?;
        self.store.put(&self.blob_name, bytes).await
    }

    /// `true` if the identity has a record.
    pub async fn contains(&self, identity: &IdentityKey) -> bool {
        self.load().await.contains_key(identity)
    }

    /// Creates a record for a new identity.
    ///
    /// # Errors
    /// - [`AuthError::AlreadyRegistered`] if a record exists
    /// - [`AuthError::Storage`] if the blob can't be read or written
    pub async fn register(&self, identity: &IdentityKey, plaintext: &str) -> Result<(), AuthError> {
        let record = self.seal(plaintext).await?;

        let _guard = self.write_lock.lock().await;
        let mut passwords = self.load_strict().await?;
        if passwords.contains_key(identity) {
            return Err(AuthError::AlreadyRegistered(identity.clone()));
        }
        passwords.insert(identity.clone(), record);
        self.save(&passwords).await?;

        tracing::info!(%identity, "credential registered");
        Ok(())
    }

    /// Checks a password against the stored record.
    ///
    /// A record that is not a PHC hash string is compared as a literal
    /// password. In [`CredentialMode::Hashed`] such a record is re-hashed
    /// after a successful match.
    ///
    /// # Errors
    /// - [`AuthError::NotRegistered`] if there is no record
    /// - [`AuthError::InvalidCredential`] if the password doesn't match
    pub async fn verify(&self, identity: &IdentityKey, plaintext: &str) -> Result<(), AuthError> {
        let record = self
            .load()
            .await
            .remove(identity)
            .ok_or_else(|| AuthError::NotRegistered(identity.clone()))?;

        if PasswordHash::new(&record).is_ok() {
            return self.check_hash(record, plaintext).await;
        }

        if !constant_time_eq(record.as_bytes(), plaintext.as_bytes()) {
            return Err(AuthError::InvalidCredential);
        }
        if self.mode == CredentialMode::Hashed {
            match self.upgrade_literal(identity, &record, plaintext).await {
                Ok(true) => tracing::info!(%identity, "plaintext record upgraded to hash"),
                Ok(false) => tracing::debug!(%identity, "record changed before upgrade, left as is"),
                Err(e) => tracing::warn!(%identity, error = %e, "failed to upgrade plaintext record"),
            }
        }
        Ok(())
    }

    /// Re-hashes a literal record, but only if it still holds `literal`
    /// once the write lock is taken. A password set in between wins.
    async fn upgrade_literal(
        &self,
        identity: &IdentityKey,
        literal: &str,
        plaintext: &str,
    ) -> Result<bool, AuthError> {
        let record = self.seal(plaintext).await?;

        let _guard = self.write_lock.lock().await;
        let mut passwords = self.load_strict().await?;
        match passwords.get_mut(identity) {
            Some(existing) if existing == literal => *existing = record,
            _ => return Ok(false),
        }
        self.save(&passwords).await?;
        Ok(true)
    }

    /// Replaces the record of an existing identity.
    ///
    /// # Errors
    /// [`AuthError::NotRegistered`] if there is no record to replace.
    pub async fn set_password(
        &self,
        identity: &IdentityKey,
        plaintext: &str,
    ) -> Result<(), AuthError> {
        let record = self.seal(plaintext).await?;

        let _guard = self.write_lock.lock().await;
        let mut passwords = self.load_strict().await?;
        match passwords.get_mut(identity) {
            Some(existing) => *existing = record,
            None => return Err(AuthError::NotRegistered(identity.clone())),
        }
        self.save(&passwords).await?;

        tracing::info!(%identity, "credential replaced");
        Ok(())
    }

    /// Turns a plaintext password into the stored record.
    ///
    /// Hashing runs on the blocking pool so argon2's cost never stalls a
    /// runtime worker.
    async fn seal(&self, plaintext: &str) -> Result<String, AuthError> {
        if self.mode == CredentialMode::LegacyPlaintext {
            return Ok(plaintext.to_string());
        }
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_owned();
        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(plaintext.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| AuthError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
    }

    /// Verifies `plaintext` against a PHC hash string on the blocking pool.
    async fn check_hash(&self, record: String, plaintext: &str) -> Result<(), AuthError> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_owned();
        task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&record).map_err(|e| AuthError::Hash(e.to_string()))?;
            hasher
                .verify_password(plaintext.as_bytes(), &parsed)
                .map_err(|_| AuthError::InvalidCredential)
        })
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
    }
}

/// Compares two byte strings in time independent of where they differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
