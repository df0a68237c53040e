//! Redis backend for token-guarded leases.

pub mod config;
pub mod scripts;
pub mod store;

pub use config::RedisSettings;
pub use store::{RedisLeaseStore, RedisLeaseStoreBuilder};
