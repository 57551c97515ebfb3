//! Codec trait and implementations for persisted values.
//!
//! Warden persists exactly one thing: the credential map, stored as a
//! single named blob in the host's key-value store. The credential layer
//! doesn't care HOW that map becomes bytes; it only needs something that
//! implements [`Codec`].
//!
//! [`JsonCodec`] is the default. JSON keeps the blob inspectable with any
//! save-file tool, which matters when an operator has to repair an
//! account by hand.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the credential store holding it is
/// shared across every event handler task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use warden_protocol::{Codec, IdentityKey, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let mut passwords = BTreeMap::new();
/// passwords.insert(IdentityKey::from("alice"), "$argon2id$...".to_string());
///
/// let bytes = codec.encode(&passwords).unwrap();
/// let decoded: BTreeMap<IdentityKey, String> = codec.decode(&bytes).unwrap();
/// assert_eq!(passwords, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
