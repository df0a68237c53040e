//! Lua scripts for the token-guarded operations and decoding of their replies.
//!
//! Each script runs with `KEYS[1]` = lease key and `ARGV[1]` = owner token.
//! Redis executes a script atomically, so the ownership check and the
//! mutation cannot interleave with another client's commands.

use fred::types::RedisValue;
use lease_lock_core::store::{GuardedOp, GuardedReply, StoreError, StoreResult};
use lease_lock_core::ttl::LeaseTtl;
use std::time::Duration;

/// Deletes the key if it holds the token. Returns the number of keys deleted.
pub const RELEASE_SCRIPT_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;

/// Sets a new expiry (`ARGV[2]`, milliseconds) if the key holds the token.
/// Returns 1 if the expiry was set.
pub const REFRESH_SCRIPT_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('pexpire', KEYS[1], ARGV[2])
    end
    return 0
"#;

/// Returns the key's PTTL if it holds the token, otherwise `NOT_OWNER`.
pub const TTL_SCRIPT_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('pttl', KEYS[1])
    end
    return -3
"#;

/// PTTL reply for a key without expiry.
const PTTL_PERSISTENT: i64 = -1;
/// PTTL reply for a missing key.
const PTTL_MISSING: i64 = -2;
/// TTL script reply when the token does not match.
const NOT_OWNER: i64 = -3;

/// Script for a guarded operation.
pub fn script_for(op: GuardedOp) -> &'static str {
    match op {
        GuardedOp::Delete => RELEASE_SCRIPT_LUA,
        GuardedOp::Expire(_) => REFRESH_SCRIPT_LUA,
        GuardedOp::RemainingTtl => TTL_SCRIPT_LUA,
    }
}

/// Decodes a script reply into a [`GuardedReply`].
pub fn decode_reply(op: GuardedOp, reply: RedisValue) -> StoreResult<GuardedReply> {
    let value = match reply {
        RedisValue::Integer(value) => value,
        RedisValue::Null => return Err(StoreError::Nil),
        other => {
            return Err(StoreError::transport(std::io::Error::other(format!(
                "unexpected script reply: {:?}",
                other
            ))));
        }
    };

    let decoded = match (op, value) {
        (GuardedOp::Delete, 0) | (GuardedOp::Expire(_), 0) => GuardedReply::NotOwner,
        (GuardedOp::Delete, 1) => GuardedReply::Deleted,
        (GuardedOp::Expire(_), 1) => GuardedReply::ExpirySet,
        (GuardedOp::RemainingTtl, NOT_OWNER) | (GuardedOp::RemainingTtl, PTTL_MISSING) => {
            GuardedReply::NotOwner
        }
        (GuardedOp::RemainingTtl, PTTL_PERSISTENT) => GuardedReply::Ttl(LeaseTtl::Persistent),
        (GuardedOp::RemainingTtl, millis) if millis >= 0 => {
            GuardedReply::Ttl(LeaseTtl::Remaining(Duration::from_millis(millis as u64)))
        }
        (op, value) => {
            return Err(StoreError::transport(std::io::Error::other(format!(
                "unexpected reply {} to {:?}",
                value, op
            ))));
        }
    };
    Ok(decoded)
}
