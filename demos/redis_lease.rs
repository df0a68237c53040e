//! Example: Guarding a job with a Redis lease
//!
//! Run with: `cargo run --example redis_lease`
//!
//! Requires a Redis server. Settings come from `config/lease-lock.toml`;
//! set LEASE_LOCK__REDIS__URL to point somewhere else.

use lease_lock::{LeaseLockerBuilder, RedisLeaseStore, RedisSettings};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = RedisSettings::load("config/lease-lock.toml")?;
    let store = RedisLeaseStore::builder().settings(settings).build().await?;
    let locker = LeaseLockerBuilder::new().key_prefix("demo:").build(store);

    let lease = locker
        .acquire_fmt(format_args!("report:{}", "daily"), Duration::from_secs(5))
        .await?;
    if !lease.is_locked() {
        info!(key = lease.key(), "another worker holds the lease, skipping");
        return Ok(());
    }
    info!(key = lease.key(), "lease acquired");

    // Work in steps, extending the lease before it runs out
    for step in 1..=3 {
        tokio::time::sleep(Duration::from_secs(2)).await;
        lease.refresh(Duration::from_secs(5)).await?;
        let ttl = lease.ttl().await?;
        info!(step, ?ttl, "lease extended");
    }

    lease.release().await?;
    info!("lease released");
    Ok(())
}
