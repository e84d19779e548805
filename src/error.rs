//! Error types for tokensign
//!
//! Errors are organized hierarchically like the token runtime they come
//! from: loading the runtime, talking to a token, finding keys, and running
//! the signature primitives. `TokenSignError::kind` flattens them for
//! callers that only need to branch on what went wrong.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::SlotId;

/// Result type alias for tokensign operations
pub type TokenSignResult<T> = Result<T, TokenSignError>;

/// Top-level error type for all tokensign operations
#[derive(Error, Debug)]
pub enum TokenSignError {
    /// The token runtime could not be used at all
    #[error("Token runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// A specific token misbehaved or went away
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Key lookup errors
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// Signature primitive errors
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// Domain validation errors
    #[error("Validation error: {0}")]
    Domain(#[from] DomainError),

    /// Reading the payload or writing the signature failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background task running a token operation died
    #[error("Background task failed: {reason}")]
    Worker { reason: String },
}

/// Token runtime (module loading) errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or initializing the PKCS#11 module failed
    #[error("Token runtime unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Token-related errors
#[derive(Error, Debug)]
pub enum TokenError {
    /// Token info for a slot could not be read
    #[error("Failed to read token info for slot {slot_id}: {reason}")]
    MetadataRead { slot_id: SlotId, reason: String },

    /// The token is no longer present
    #[error("Selected token not found (slot {slot_id})")]
    NotFound { slot_id: SlotId },

    /// Login with the user PIN failed
    #[error("Token authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// Opening a session or another token call failed
    #[error("Token communication failed: {reason}")]
    CommunicationFailed { reason: String },
}

/// Key lookup errors
#[derive(Error, Debug)]
pub enum KeyError {
    /// Reading the key's type failed
    #[error("Failed to resolve key type: {reason}")]
    ResolutionFailed { reason: String },

    /// No private key with `CKA_SIGN` on the token
    #[error("No private signing key found on token")]
    NoSigningKey,

    /// No public key object on the token
    #[error("No public key found on token")]
    NoPublicKey,
}

/// Signature primitive errors
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The sign or verify call itself failed
    #[error("{operation} operation failed: {reason}")]
    OperationFailed {
        operation: CryptoOperation,
        reason: String,
    },

    /// The mechanism cannot be driven by this runtime
    #[error("Mechanism not supported: {mechanism}")]
    UnsupportedMechanism { mechanism: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoOperation {
    Sign,
    Verify,
}

impl std::fmt::Display for CryptoOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sign => f.write_str("Sign"),
            Self::Verify => f.write_str("Verify"),
        }
    }
}

/// Domain validation errors
#[derive(Error, Debug)]
pub enum DomainError {
    /// PIN validation error
    #[error("PIN validation error: {0}")]
    Pin(#[from] crate::model::PinError),

    /// Mechanism parsing error
    #[error("Mechanism error: {0}")]
    Mechanism(#[from] crate::model::MechanismError),

    /// Signature file naming error
    #[error("Signature artifact error: {0}")]
    Artifact(#[from] crate::model::ArtifactError),
}

/// Flat view of the error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RuntimeUnavailable,
    TokenMetadataReadFailure,
    TokenNotFound,
    /// A token call failed for a reason other than removal or a bad PIN
    /// (`C_OpenSession`, `C_FindObjects`, `C_Logout`, ...)
    TokenCommunicationFailure,
    KeyResolutionFailure,
    AuthenticationFailure,
    NoSigningKey,
    NoPublicKey,
    CryptoOperationFailure,
    IoFailure,
    /// A PIN, mechanism or signature path was rejected before any token call
    InvalidInput,
    /// The background task running the operation panicked or was cancelled
    Internal,
}

impl TokenSignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Runtime(RuntimeError::Unavailable { .. }) => ErrorKind::RuntimeUnavailable,
            Self::Token(TokenError::MetadataRead { .. }) => ErrorKind::TokenMetadataReadFailure,
            Self::Token(TokenError::NotFound { .. }) => ErrorKind::TokenNotFound,
            Self::Token(TokenError::AuthenticationFailed { .. }) => {
                ErrorKind::AuthenticationFailure
            }
            Self::Token(TokenError::CommunicationFailed { .. }) => {
                ErrorKind::TokenCommunicationFailure
            }
            Self::Key(KeyError::ResolutionFailed { .. }) => ErrorKind::KeyResolutionFailure,
            Self::Key(KeyError::NoSigningKey) => ErrorKind::NoSigningKey,
            Self::Key(KeyError::NoPublicKey) => ErrorKind::NoPublicKey,
            Self::Crypto(_) => ErrorKind::CryptoOperationFailure,
            Self::Domain(_) => ErrorKind::InvalidInput,
            Self::Io { .. } => ErrorKind::IoFailure,
            Self::Worker { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<crate::model::PinError> for TokenSignError {
    fn from(err: crate::model::PinError) -> Self {
        TokenSignError::Domain(DomainError::Pin(err))
    }
}

impl From<crate::model::MechanismError> for TokenSignError {
    fn from(err: crate::model::MechanismError) -> Self {
        TokenSignError::Domain(DomainError::Mechanism(err))
    }
}

impl From<crate::model::ArtifactError> for TokenSignError {
    fn from(err: crate::model::ArtifactError) -> Self {
        TokenSignError::Domain(DomainError::Artifact(err))
    }
}
