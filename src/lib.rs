//! Token-guarded leases on a shared key-value store.
//!
//! A lease is a key in a shared store whose value is a secret random token
//! and whose TTL bounds how long the holder may keep it. Processes that agree
//! on a key name get mutual exclusion through the store's atomic
//! "set if absent", and every follow-up operation compares the token inside
//! the store before acting, so a holder can only refresh or release its own
//! lease.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lease_lock::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisLeaseStore::new("redis://localhost:6379").await?;
//!     let locker = LeaseLockerBuilder::new().key_prefix("billing:").build(store);
//!
//!     let lease = locker.acquire("invoice-run", Duration::from_secs(30)).await?;
//!     if !lease.is_locked() {
//!         // Another process is already running it
//!         return Ok(());
//!     }
//!
//!     // Critical section; extend the lease while work continues
//!     lease.refresh(Duration::from_secs(30)).await?;
//!
//!     lease.release().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Operations
//!
//! - **acquire**: one `set if absent` round trip; contention yields an
//!   unlocked lease, not an error
//! - **refresh**: extend the TTL if still the owner, else `NotObtained`
//! - **release**: delete if still the owner, else `NotHeld`
//! - **ttl**: remaining lifetime if still the owner, else zero
//!
//! None of them wait or retry. Callers that want to wait for a contended
//! lease loop around `acquire` with their own backoff.
//!
//! # Backends
//!
//! ## Redis
//!
//! `SET NX PX` plus Lua scripts for the token-guarded operations.
//!
//! ```rust,no_run
//! use lease_lock::{RedisLeaseStore, RedisSettings};
//!
//! # async fn connect() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = RedisSettings::load("config/lease-lock.toml")?;
//! let store = RedisLeaseStore::builder().settings(settings).build().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Memory
//!
//! A mutex-guarded map for tests and single-process use.
//!
//! ```rust
//! use lease_lock::{LeaseLocker, MemoryLeaseStore};
//!
//! let locker = LeaseLocker::new(MemoryLeaseStore::new());
//! ```
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `lease-lock-core`: lease handle, token generator, store contract
//! - `lease-lock-memory`: in-process backend
//! - `lease-lock-redis`: Redis backend
//!
//! For fine-grained control, you can depend on individual crates instead.

// Re-export core types and traits
pub use lease_lock_core::*;

// Re-export memory backend
pub use lease_lock_memory::MemoryLeaseStore;

// Re-export redis backend
pub use lease_lock_redis::{RedisLeaseStore, RedisLeaseStoreBuilder, RedisSettings};
