//! Lease acquisition and the owner-only operations on a held lease.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Span, error, field, instrument, warn};

use crate::error::{LockError, LockResult};
use crate::store::{GuardedOp, GuardedReply, LeaseStore, StoreError};
use crate::token::Token;
use crate::ttl::{LeaseTtl, MAX_TTL};

// ============================================================================
// Locker
// ============================================================================

/// Builder for [`LeaseLocker`] configuration.
#[derive(Debug, Clone, Default)]
pub struct LeaseLockerBuilder {
    key_prefix: String,
}

impl LeaseLockerBuilder {
    /// Creates a new builder with no key prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a namespace prepended to every lease key.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Builds a locker on top of `store`.
    pub fn build<S: LeaseStore>(self, store: S) -> LeaseLocker<S> {
        LeaseLocker {
            store: Arc::new(store),
            key_prefix: self.key_prefix,
        }
    }
}

/// Entry point for acquiring leases on a shared store.
///
/// Cheap to clone; clones share the store adapter.
///
/// # Example
///
/// ```rust,ignore
/// let locker = LeaseLocker::new(store);
/// let lease = locker.acquire("jobs:nightly", Duration::from_secs(30)).await?;
/// if !lease.is_locked() {
///     return Ok(()); // someone else is running it
/// }
/// run_job().await;
/// lease.release().await?;
/// ```
pub struct LeaseLocker<S> {
    store: Arc<S>,
    key_prefix: String,
}

impl<S> Clone for LeaseLocker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key_prefix: self.key_prefix.clone(),
        }
    }
}

impl<S: LeaseStore> LeaseLocker<S> {
    /// Creates a locker with default settings.
    ///
    /// Use [`LeaseLockerBuilder`] to set a key prefix.
    pub fn new(store: S) -> Self {
        LeaseLockerBuilder::new().build(store)
    }

    /// The underlying store adapter.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Namespace prepended to every key this locker acquires.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Attempts to claim `key` for `ttl` without waiting.
    ///
    /// Contention is not an error: the returned lease reports
    /// `is_locked() == false`. A zero `ttl` stores the lease without expiry
    /// when the backend allows it and is rejected otherwise.
    ///
    /// # Errors
    ///
    /// * [`LockError::InvalidKey`] - `key` is empty
    /// * [`LockError::InvalidTtl`] - zero `ttl` on a store without persistent
    ///   keys, or `ttl` above [`MAX_TTL`]
    /// * [`LockError::Generation`] - the token source failed; the store was not contacted
    /// * [`LockError::Transport`] - the store round trip failed
    #[instrument(
        skip(self),
        fields(
            lease.key = %key,
            backend = self.store.backend(),
            acquired = field::Empty,
            elapsed_ms = field::Empty,
        )
    )]
    pub async fn acquire(&self, key: &str, ttl: Duration) -> LockResult<Lease<S>> {
        let start = Instant::now();

        if key.is_empty() {
            return Err(LockError::InvalidKey("lease key cannot be empty".to_string()));
        }

        check_max_ttl(ttl)?;
        let expiry = if ttl.is_zero() {
            if !self.store.supports_persistent_keys() {
                return Err(LockError::InvalidTtl(format!(
                    "{} store requires a positive ttl",
                    self.store.backend()
                )));
            }
            None
        } else {
            Some(ttl)
        };

        let token = Token::generate().inspect_err(|e| {
            error!(error = %e, "failed to mint lease token");
        })?;

        let key = format!("{}{}", self.key_prefix, key);
        let locked = match self.store.set_if_absent(&key, token.as_str(), expiry).await {
            Ok(created) => created,
            Err(StoreError::Nil) => false,
            Err(StoreError::Transport(e)) => {
                error!(error = %e, "lease acquire failed");
                return Err(LockError::Transport(e));
            }
        };

        Span::current().record("acquired", locked);
        Span::current().record("elapsed_ms", start.elapsed().as_millis() as u64);

        Ok(Lease {
            key,
            token,
            locked,
            store: self.store.clone(),
        })
    }

    /// Like [`acquire`](Self::acquire), building the key from format arguments.
    ///
    /// ```rust,ignore
    /// let lease = locker
    ///     .acquire_fmt(format_args!("user:{}:register", user_id), Duration::from_secs(5))
    ///     .await?;
    /// ```
    pub fn acquire_fmt(
        &self,
        key: fmt::Arguments<'_>,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<Lease<S>>> + Send {
        let key = key.to_string();
        async move { self.acquire(&key, ttl).await }
    }
}

// ============================================================================
// Lease Handle
// ============================================================================

/// Result of one acquisition attempt.
///
/// Carries the key, the secret ownership token and whether the claim
/// succeeded. Every follow-up operation sends the token to the store, which
/// compares it against the stored value before acting, so a stale or
/// unlocked handle can never touch another holder's lease.
///
/// Dropping a lease does not release it; the store expires it after its TTL.
pub struct Lease<S> {
    key: String,
    token: Token,
    locked: bool,
    store: Arc<S>,
}

impl<S> fmt::Debug for Lease<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("key", &self.key)
            .field("token", &self.token)
            .field("locked", &self.locked)
            .finish()
    }
}

impl<S: LeaseStore> Lease<S> {
    /// The full store key, including any locker prefix.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the initial claim succeeded.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Converts an unobtained lease into [`LockError::NotObtained`].
    pub fn ensure_locked(self) -> LockResult<Self> {
        if self.locked {
            Ok(self)
        } else {
            Err(LockError::NotObtained)
        }
    }

    /// Extends the lease to `ttl` from now, if this handle still owns it.
    ///
    /// # Errors
    ///
    /// * [`LockError::NotObtained`] - the lease expired or belongs to someone else
    /// * [`LockError::InvalidTtl`] - `ttl` is zero or above [`MAX_TTL`]
    /// * [`LockError::Transport`] - the store round trip failed
    #[instrument(skip(self), fields(lease.key = %self.key, backend = self.store.backend()))]
    pub async fn refresh(&self, ttl: Duration) -> LockResult<()> {
        if ttl.is_zero() {
            return Err(LockError::InvalidTtl(
                "refresh requires a positive ttl".to_string(),
            ));
        }
        check_max_ttl(ttl)?;

        let reply = self
            .store
            .compare_and_mutate(&self.key, self.token.as_str(), GuardedOp::Expire(ttl))
            .await;
        match reply {
            Ok(GuardedReply::ExpirySet) => Ok(()),
            Ok(GuardedReply::NotOwner) | Err(StoreError::Nil) => Err(LockError::NotObtained),
            Ok(other) => Err(unexpected_reply("refresh", other)),
            Err(StoreError::Transport(e)) => Err(LockError::Transport(e)),
        }
    }

    /// Deletes the lease, if this handle still owns it.
    ///
    /// Safe to call repeatedly: once the lease is gone every call reports
    /// [`LockError::NotHeld`] and never touches a newer holder's lease.
    ///
    /// # Errors
    ///
    /// * [`LockError::NotHeld`] - already released, expired or owned by someone else
    /// * [`LockError::Transport`] - the store round trip failed
    #[instrument(skip(self), fields(lease.key = %self.key, backend = self.store.backend()))]
    pub async fn release(&self) -> LockResult<()> {
        let reply = self
            .store
            .compare_and_mutate(&self.key, self.token.as_str(), GuardedOp::Delete)
            .await;
        match reply {
            Ok(GuardedReply::Deleted) => Ok(()),
            Ok(GuardedReply::NotOwner) | Err(StoreError::Nil) => Err(LockError::NotHeld),
            Ok(other) => Err(unexpected_reply("release", other)),
            Err(StoreError::Transport(e)) => Err(LockError::Transport(e)),
        }
    }

    /// Releases the lease, logging instead of returning any failure.
    ///
    /// Meant for cleanup paths that cannot react to an error. This is the only
    /// operation that hides errors from its caller, transport failures
    /// included; use [`release`](Self::release) when the outcome matters.
    pub async fn logged_release(&self) {
        match self.release().await {
            Ok(()) => {}
            Err(LockError::NotHeld) => {
                warn!(lease.key = %self.key, "lease not held at release");
            }
            Err(e) => {
                error!(lease.key = %self.key, error = %e, "lease release failed");
            }
        }
    }

    /// Reads the remaining lifetime of the lease.
    ///
    /// Returns [`LeaseTtl::ZERO`] without error when this handle no longer
    /// owns the lease, and [`LeaseTtl::Persistent`] for an owned lease
    /// stored without expiry.
    ///
    /// # Errors
    ///
    /// * [`LockError::Transport`] - the store round trip failed
    #[instrument(skip(self), fields(lease.key = %self.key, backend = self.store.backend()))]
    pub async fn ttl(&self) -> LockResult<LeaseTtl> {
        let reply = self
            .store
            .compare_and_mutate(&self.key, self.token.as_str(), GuardedOp::RemainingTtl)
            .await;
        match reply {
            Ok(GuardedReply::Ttl(ttl)) => Ok(ttl),
            Ok(GuardedReply::NotOwner) | Err(StoreError::Nil) => Ok(LeaseTtl::ZERO),
            Ok(other) => Err(unexpected_reply("ttl", other)),
            Err(StoreError::Transport(e)) => Err(LockError::Transport(e)),
        }
    }
}

fn check_max_ttl(ttl: Duration) -> LockResult<()> {
    if ttl > MAX_TTL {
        return Err(LockError::InvalidTtl(format!(
            "ttl {ttl:?} exceeds the maximum of {MAX_TTL:?}"
        )));
    }
    Ok(())
}

fn unexpected_reply(op: &str, reply: GuardedReply) -> LockError {
    LockError::Transport(Box::new(std::io::Error::other(format!(
        "unexpected store reply to {op}: {reply:?}"
    ))))
}
