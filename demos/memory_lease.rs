//! Example: Several tasks racing for one lease in-process
//!
//! Run with: `cargo run --example memory_lease`

use lease_lock::{LeaseLocker, MemoryLeaseStore};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let locker = LeaseLocker::new(MemoryLeaseStore::new());

    let mut tasks = Vec::new();
    for worker in 0..4 {
        let locker = locker.clone();
        tasks.push(tokio::spawn(async move {
            // Retry policy belongs to the caller: poll until the lease frees up
            loop {
                let lease = locker.acquire("shared-resource", Duration::from_secs(1)).await?;
                if lease.is_locked() {
                    info!(worker, "working");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    lease.logged_release().await;
                    return Ok::<_, lease_lock::LockError>(());
                }
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        }));
    }

    for task in tasks {
        task.await??;
    }
    Ok(())
}
