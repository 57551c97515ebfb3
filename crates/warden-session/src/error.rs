//! Error types for the session layer.

use warden_protocol::{CommandStatus, IdentityKey, ProtocolError};

/// Errors an authentication command can end in.
///
/// Every variant is recoverable and user-visible: the command surface
/// turns it into a [`CommandReply`](warden_protocol::CommandReply) via
/// [`AuthError::status`]. None of them is ever a server fault.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The command was issued without its password argument.
    #[error("missing argument")]
    MissingArgument,

    /// `register` for an identity that already has a credential record.
    #[error("{0} is already registered")]
    AlreadyRegistered(IdentityKey),

    /// `login` or a password change for an identity with no record.
    #[error("{0} is not registered")]
    NotRegistered(IdentityKey),

    /// The password did not match the stored record.
    #[error("invalid credential")]
    InvalidCredential,

    /// `login` from an identity that is not gated.
    #[error("{0} is already authenticated")]
    AlreadyAuthenticated(IdentityKey),

    /// `changepassword` from an identity that is still gated.
    #[error("{0} is not authenticated")]
    NotAuthenticated(IdentityKey),

    /// The attempt threshold was reached. The connection is terminated
    /// as a side effect; this error only carries the message.
    #[error("too many attempts by {0}")]
    TooManyAttempts(IdentityKey),

    /// An admin target named more than one connected participant.
    #[error("{0} matches more than one connected participant")]
    AmbiguousIdentity(String),

    /// An admin target matched no record and no connected participant.
    #[error("no participant or record matches {0}")]
    UnknownIdentity(String),

    /// The password hasher rejected its input or its parameters.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// The credential blob could not be written.
    #[error("credential storage failed: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    /// Maps the error onto the closed status-code set of the command surface.
    pub fn status(&self) -> CommandStatus {
        match self {
            Self::MissingArgument => CommandStatus::MissingArgument,
            Self::AlreadyRegistered(_) => CommandStatus::AlreadyRegistered,
            Self::NotRegistered(_) => CommandStatus::NotRegistered,
            Self::InvalidCredential => CommandStatus::InvalidCredential,
            Self::AlreadyAuthenticated(_) => CommandStatus::AlreadyAuthenticated,
            Self::NotAuthenticated(_) => CommandStatus::NotAuthenticated,
            Self::TooManyAttempts(_) => CommandStatus::TooManyAttempts,
            Self::AmbiguousIdentity(_) => CommandStatus::AmbiguousIdentity,
            Self::UnknownIdentity(_) => CommandStatus::UnknownIdentity,
            Self::Hash(_) | Self::Storage(_) => CommandStatus::StorageFailure,
        }
    }
}

/// Errors from the persistent blob store behind the credential map.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem-level failure (file-backed store).
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The blob could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] ProtocolError),

    /// The host's store refused the request (world not loaded, shutting down).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
