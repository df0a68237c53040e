//! Store wrapper that can be switched offline to simulate transport failures.

use lease_lock::store::{GuardedOp, GuardedReply, LeaseStore, StoreError, StoreResult};
use lease_lock::MemoryLeaseStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Memory store that fails every call while offline.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryLeaseStore,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        let store = Self::new();
        store.set_offline(true);
        store
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of round trips attempted, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryLeaseStore {
        &self.inner
    }

    fn check(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "store unreachable",
            )));
        }
        Ok(())
    }
}

impl LeaseStore for FlakyStore {
    fn backend(&self) -> &'static str {
        "flaky"
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn compare_and_mutate(
        &self,
        key: &str,
        expected: &str,
        op: GuardedOp,
    ) -> StoreResult<GuardedReply> {
        self.check()?;
        self.inner.compare_and_mutate(key, expected, op).await
    }
}
