//! Unified error type for Warden.

use warden_protocol::ProtocolError;
use warden_session::{AuthError, StoreError};

/// Failure to read the operator's config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `warden` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// Encoding or decoding a persisted value failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An authentication command failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The blob store could not be reached.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The config file could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
