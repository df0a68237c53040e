//! Convenience prelude for lease types.

pub use crate::error::{LockError, LockResult};
pub use crate::lease::{Lease, LeaseLocker, LeaseLockerBuilder};
pub use crate::store::{GuardedOp, GuardedReply, LeaseStore, StoreError, StoreResult};
pub use crate::ttl::LeaseTtl;
