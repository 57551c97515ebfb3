//! Identity gating state for Warden.
//!
//! This crate holds everything Warden knows about an identity that isn't
//! inventory:
//!
//! 1. **Session tracking**: who is still gated ([`SessionRegistry`])
//! 2. **Attempt limiting**: failed attempts with decay, and dead flags
//!    ([`AttemptTracker`])
//! 3. **Credentials**: password records persisted as one blob
//!    ([`CredentialStore`] over a [`BlobStore`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Warden (above)  ← event handlers, commands, action gate
//!     ↕
//! Session Layer (this crate)  ← gated identities, counters, passwords
//!     ↕
//! Protocol Layer (below)  ← IdentityKey, Codec, CommandStatus
//! ```
//!
//! No component here holds a reference into another's map; everything is
//! keyed by [`IdentityKey`](warden_protocol::IdentityKey).

mod attempts;
mod credentials;
mod error;
mod manager;
mod session;
mod store;

pub use attempts::{AttemptKind, AttemptTracker};
pub use credentials::{CREDENTIAL_FORMAT, CredentialMode, CredentialStore, HashParams};
pub use error::{AuthError, StoreError};
pub use manager::SessionRegistry;
pub use session::SessionState;
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore};
