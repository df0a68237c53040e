//! In-process backend for token-guarded leases.
//!
//! Implements the same store contract as the Redis backend with a
//! mutex-guarded map, for tests and single-process deployments.

pub mod store;

pub use store::MemoryLeaseStore;
