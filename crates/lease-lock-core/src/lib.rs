//! Core types for token-guarded leases on a shared key-value store.

pub mod error;
pub mod lease;
pub mod prelude;
pub mod store;
pub mod token;
pub mod ttl;

pub use error::{LockError, LockResult};
pub use prelude::*;
