//! In-process lease store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lease_lock_core::store::{GuardedOp, GuardedReply, LeaseStore, StoreResult};
use lease_lock_core::ttl::LeaseTtl;
use tokio::time::Instant;
use tracing::trace;

/// Map size below which inserts never sweep.
const MIN_SWEEP_LEN: usize = 1024;

/// Minimum time between two sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

struct Entry {
    value: String,
    /// `None` for keys stored without expiry.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Table {
    entries: HashMap<String, Entry>,
    /// Earliest time the next sweep may run; `None` before the first one.
    next_sweep: Option<Instant>,
}

impl Table {
    /// Looks up `key`, evicting it first if it has expired.
    fn live_entry(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(|e| !e.is_live(now)) {
            trace!(key, "evicting expired lease");
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    /// Drops every expired key, at most once per [`SWEEP_INTERVAL`] and only
    /// once the map holds [`MIN_SWEEP_LEN`] keys.
    fn sweep(&mut self, now: Instant) {
        if self.entries.len() < MIN_SWEEP_LEN || self.next_sweep.is_some_and(|at| now < at) {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(now));
        self.next_sweep = Some(now + SWEEP_INTERVAL);
        trace!(
            evicted = before - self.entries.len(),
            remaining = self.entries.len(),
            "swept expired leases"
        );
    }
}

/// Lease store backed by a mutex-guarded map.
///
/// Every operation runs under one lock, which is what makes the guarded
/// operations atomic. Expired keys are dropped when touched, and inserts
/// into a large map periodically sweep out the ones nobody touches. Expiry
/// uses `tokio::time`, so paused-clock tests can advance it.
///
/// Only coordinates tasks within one process; share it behind the
/// [`LeaseLocker`](lease_lock_core::lease::LeaseLocker), which already holds
/// it in an `Arc`.
#[derive(Default)]
pub struct MemoryLeaseStore {
    table: Mutex<Table>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.table().entries.values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is currently held by anyone.
    pub fn contains_key(&self, key: &str) -> bool {
        self.table().live_entry(key, Instant::now()).is_some()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        // No operation can panic halfway through a mutation.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LeaseStore for MemoryLeaseStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        let now = Instant::now();
        let mut table = self.table();
        if table.live_entry(key, now).is_some() {
            return Ok(false);
        }

        table.sweep(now);
        table.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            },
        );
        Ok(true)
    }

    async fn compare_and_mutate(
        &self,
        key: &str,
        expected: &str,
        op: GuardedOp,
    ) -> StoreResult<GuardedReply> {
        let now = Instant::now();
        let mut table = self.table();
        let Some(entry) = table.live_entry(key, now).filter(|e| e.value == expected) else {
            return Ok(GuardedReply::NotOwner);
        };

        let reply = match op {
            GuardedOp::Delete => {
                table.entries.remove(key);
                GuardedReply::Deleted
            }
            GuardedOp::Expire(ttl) => {
                entry.expires_at = now.checked_add(ttl);
                GuardedReply::ExpirySet
            }
            GuardedOp::RemainingTtl => GuardedReply::Ttl(match entry.expires_at {
                Some(at) => LeaseTtl::Remaining(at.saturating_duration_since(now)),
                None => LeaseTtl::Persistent,
            }),
        };
        Ok(reply)
    }
}
