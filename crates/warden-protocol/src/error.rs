//! Error types for the protocol layer.
//!
//! Each crate in Warden defines its own error enum. A `ProtocolError`
//! always means a serialization problem, never a storage or session one.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: a truncated blob, a hand-edited save file with a
    /// syntax error, or a value of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bytes decoded, but carry a format tag this build does not know.
    ///
    /// Written by a newer release; refusing it is safer than guessing.
    #[error("unsupported blob format {0}")]
    UnsupportedFormat(u32),
}
