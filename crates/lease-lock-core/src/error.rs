//! Error types for lease operations.

use thiserror::Error;

/// Errors that can occur during lease operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The lease could not be obtained or extended.
    ///
    /// Returned by `refresh` when the key is gone or owned by another token.
    #[error("lease not obtained")]
    NotObtained,

    /// The lease is not held by this handle (released, expired or stolen).
    #[error("lease not held")]
    NotHeld,

    /// The store round trip failed (network, auth, protocol).
    #[error("store transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The random source failed while minting an ownership token.
    #[error("token generation failed: {0}")]
    Generation(#[source] rand::Error),

    /// Invalid lease key.
    #[error("invalid lease key: {0}")]
    InvalidKey(String),

    /// TTL not usable with this store or operation.
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),

    /// Store or locker configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LockError {
    /// Returns `true` for the expected outcomes of a race with another holder.
    pub fn is_contention(&self) -> bool {
        matches!(self, LockError::NotObtained | LockError::NotHeld)
    }

    /// Returns `true` if the store itself could not be reached or answered badly.
    pub fn is_transport(&self) -> bool {
        matches!(self, LockError::Transport(_))
    }
}

/// Result type for lease operations.
pub type LockResult<T> = Result<T, LockError>;
