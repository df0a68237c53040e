//! Integration tests for Redis-backed leases.

use lease_lock::{LeaseLocker, LeaseLockerBuilder, LeaseTtl, LockError, RedisLeaseStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

mod common;

/// Helper to get Redis URL from environment or use default.
fn get_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// Locker with a per-test namespace so runs don't collide on a shared server.
async fn locker(test: &str) -> LeaseLocker<RedisLeaseStore> {
    common::init_tracing();
    let store = RedisLeaseStore::builder()
        .url(get_redis_url())
        .command_timeout(Duration::from_secs(2))
        .build()
        .await
        .unwrap();
    LeaseLockerBuilder::new()
        .key_prefix(format!("lease-lock-test:{}:", test))
        .build(store)
}

fn remaining(ttl: LeaseTtl) -> Duration {
    ttl.as_duration().expect("lease should expire")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore] // Requires Redis server running
async fn test_mutual_exclusion_under_contention() {
    const CONTENDERS: usize = 50;

    let locker = locker("contention").await;
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let tasks: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let locker = locker.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                locker.acquire("resource", Duration::from_secs(5)).await.unwrap()
            })
        })
        .collect();

    let mut leases = Vec::new();
    for task in tasks {
        leases.push(task.await.unwrap());
    }
    assert_eq!(leases.iter().filter(|l| l.is_locked()).count(), 1);

    for lease in leases.iter().filter(|l| l.is_locked()) {
        lease.release().await.unwrap();
    }
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_release_frees_key() {
    let locker = locker("round-trip").await;

    let lease = locker.acquire("resource", Duration::from_secs(5)).await.unwrap();
    assert!(lease.is_locked());
    lease.release().await.unwrap();

    // A separate connection sees the key gone
    let other = self::locker("round-trip").await;
    let lease2 = other.acquire("resource", Duration::from_secs(5)).await.unwrap();
    assert!(lease2.is_locked());
    lease2.release().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_ownership_isolation() {
    let locker = locker("isolation").await;

    let lease_a = locker.acquire("resource", Duration::from_secs(5)).await.unwrap();
    assert!(lease_a.is_locked());

    let lease_b = locker.acquire("resource", Duration::from_secs(5)).await.unwrap();
    assert!(!lease_b.is_locked());
    assert!(matches!(lease_b.release().await.unwrap_err(), LockError::NotHeld));

    // A still holds it
    assert!(!lease_a.ttl().await.unwrap().is_zero());
    lease_a.release().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_ttl_counts_down() {
    let locker = locker("countdown").await;
    let lease = locker.acquire("resource", Duration::from_secs(10)).await.unwrap();

    let first = remaining(lease.ttl().await.unwrap());
    assert!(first > Duration::from_millis(9_500) && first <= Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(2)).await;

    let second = remaining(lease.ttl().await.unwrap());
    assert!(second < first);
    assert!(second > Duration::from_millis(7_500) && second <= Duration::from_secs(8));

    lease.logged_release().await;
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_refresh_extends_lease() {
    let locker = locker("refresh").await;
    let lease = locker.acquire("resource", Duration::from_secs(2)).await.unwrap();

    lease.refresh(Duration::from_secs(10)).await.unwrap();
    let ttl = remaining(lease.ttl().await.unwrap());
    assert!(ttl > Duration::from_millis(9_500));

    lease.release().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_expiry_safety_net() {
    let locker = locker("expiry").await;
    let lease = locker.acquire("resource", Duration::from_secs(1)).await.unwrap();
    assert!(lease.is_locked());

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    assert!(matches!(lease.release().await.unwrap_err(), LockError::NotHeld));
    assert!(matches!(
        lease.refresh(Duration::from_secs(5)).await.unwrap_err(),
        LockError::NotObtained
    ));

    let fresh = locker.acquire("resource", Duration::from_secs(1)).await.unwrap();
    assert!(fresh.is_locked());
    fresh.release().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_persistent_lease() {
    let locker = locker("persistent").await;
    let lease = locker.acquire("resource", Duration::ZERO).await.unwrap();
    assert!(lease.is_locked());
    assert_eq!(lease.ttl().await.unwrap(), LeaseTtl::Persistent);
    lease.release().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_sub_millisecond_ttl_still_expires() {
    let locker = locker("sub-ms").await;
    let lease = locker.acquire("resource", Duration::from_micros(100)).await.unwrap();
    assert!(lease.is_locked());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let again = locker.acquire("resource", Duration::from_secs(1)).await.unwrap();
    assert!(again.is_locked());
    again.release().await.unwrap();
}

#[tokio::test]
async fn test_builder_requires_target() {
    let result = RedisLeaseStore::builder().build().await;
    assert!(matches!(result, Err(LockError::InvalidConfig(_))));
}
