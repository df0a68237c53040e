//! The narrow contract a key-value backend must offer to host leases.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::ttl::LeaseTtl;

// ============================================================================
// Store Errors
// ============================================================================

/// Errors reported by a [`LeaseStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store answered with its "no such key" sentinel.
    #[error("key does not exist")]
    Nil,

    /// The round trip itself failed.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps any backend error as a transport failure.
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }
}

/// Result type for store round trips.
pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Guarded Operations
// ============================================================================

/// A mutation or read that only applies when the stored value equals the
/// caller's token.
///
/// Each variant must execute as one atomic operation on the backend: the
/// comparison and the action may not be split across round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedOp {
    /// Delete the key.
    Delete,
    /// Set a new expiry on the key.
    Expire(Duration),
    /// Read the key's remaining time-to-live.
    RemainingTtl,
}

/// Outcome of a [`GuardedOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedReply {
    /// The key is absent or holds a different token; nothing was done.
    NotOwner,
    /// [`GuardedOp::Delete`] removed the key.
    Deleted,
    /// [`GuardedOp::Expire`] set the new expiry.
    ExpirySet,
    /// [`GuardedOp::RemainingTtl`] read the remaining lifetime.
    Ttl(LeaseTtl),
}

// ============================================================================
// Store Trait
// ============================================================================

/// Backend hosting leases.
///
/// Implementations provide the atomicity; the lease logic never performs a
/// read-compare-write sequence itself.
///
/// # Example
///
/// ```rust,ignore
/// let created = store
///     .set_if_absent("jobs:nightly", token.as_str(), Some(Duration::from_secs(30)))
///     .await?;
/// let reply = store
///     .compare_and_mutate("jobs:nightly", token.as_str(), GuardedOp::Delete)
///     .await?;
/// ```
pub trait LeaseStore: Send + Sync {
    /// Short backend name used in tracing spans.
    fn backend(&self) -> &'static str;

    /// Whether keys may be stored without an expiry.
    fn supports_persistent_keys(&self) -> bool {
        true
    }

    /// Atomically creates `key = value` if the key is absent.
    ///
    /// `ttl` of `None` stores the key without expiry. Returns `true` if the key
    /// was created, `false` if it already existed.
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Atomically applies `op` to `key` if its value equals `expected`.
    fn compare_and_mutate(
        &self,
        key: &str,
        expected: &str,
        op: GuardedOp,
    ) -> impl Future<Output = StoreResult<GuardedReply>> + Send;
}
