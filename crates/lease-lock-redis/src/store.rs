//! Redis lease store.

use std::future::Future;
use std::time::Duration;

use fred::prelude::*;
use fred::types::{Expiration, RedisValue, SetOptions};
use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::store::{GuardedOp, GuardedReply, LeaseStore, StoreError, StoreResult};
use lease_lock_core::ttl::expiry_millis;
use tracing::debug;

use crate::config::RedisSettings;
use crate::scripts::{decode_reply, script_for};

/// Builder for [`RedisLeaseStore`] configuration.
#[derive(Default)]
pub struct RedisLeaseStoreBuilder {
    url: Option<String>,
    client: Option<RedisClient>,
    settings: Option<RedisSettings>,
    command_timeout: Option<Duration>,
}

impl RedisLeaseStoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to the server at `url`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses an existing Redis client.
    ///
    /// The client is used as-is; the caller is responsible for connecting it.
    pub fn client(mut self, client: RedisClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Connects using loaded settings.
    pub fn settings(mut self, settings: RedisSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Bounds every lease round trip; an elapsed bound is a transport error.
    ///
    /// Overrides `command_timeout_ms` from the settings.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Builds the store, connecting to Redis unless a client was supplied.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidConfig`] if no client, URL or settings
    /// were given or they are malformed, and [`LockError::Transport`] if the
    /// connection fails.
    pub async fn build(self) -> LockResult<RedisLeaseStore> {
        let settings_timeout = self.settings.as_ref().and_then(RedisSettings::command_timeout);
        let command_timeout = self.command_timeout.or(settings_timeout);

        if let Some(client) = self.client {
            return Ok(RedisLeaseStore {
                client,
                command_timeout,
            });
        }

        let settings = match (self.settings, self.url) {
            (Some(settings), _) => settings,
            (None, Some(url)) => RedisSettings::from_url(url),
            (None, None) => {
                return Err(LockError::InvalidConfig(
                    "no Redis client, url or settings provided".to_string(),
                ));
            }
        };

        let client = RedisClient::new(
            settings.redis_config()?,
            None,
            settings.connection_config(),
            settings.reconnect_policy(),
        );
        client.connect();
        client.wait_for_connect().await.map_err(|e| {
            LockError::Transport(Box::new(std::io::Error::other(format!(
                "failed to connect to Redis: {}",
                e
            ))))
        })?;
        debug!("connected to Redis");

        Ok(RedisLeaseStore {
            client,
            command_timeout,
        })
    }
}

/// Lease store on a single Redis deployment.
///
/// Acquisition is `SET key token PX ttl NX`; the guarded operations run as
/// Lua scripts so the ownership check and the mutation are one atomic step.
#[derive(Clone)]
pub struct RedisLeaseStore {
    client: RedisClient,
    command_timeout: Option<Duration>,
}

impl RedisLeaseStore {
    /// Returns a new builder for configuring the store.
    pub fn builder() -> RedisLeaseStoreBuilder {
        RedisLeaseStoreBuilder::new()
    }

    /// Connects to the server at `url`.
    pub async fn new(url: impl Into<String>) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }

    /// The underlying client.
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    async fn bounded<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, RedisError>>,
    ) -> StoreResult<T> {
        let result = match self.command_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                StoreError::transport(std::io::Error::other(format!(
                    "Redis {} timed out after {:?}",
                    op, limit
                )))
            })?,
            None => fut.await,
        };
        result.map_err(|e| {
            StoreError::transport(std::io::Error::other(format!("Redis {} failed: {}", op, e)))
        })
    }
}

impl LeaseStore for RedisLeaseStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        let expiration = ttl.map(|ttl| Expiration::PX(expiry_millis(ttl)));

        // SET NX replies OK when the key was set and nil when it already exists
        let result: Option<String> = self
            .bounded(
                "SET NX",
                self.client
                    .set(key, value, expiration, Some(SetOptions::NX), false),
            )
            .await?;

        debug!(key, created = result.is_some(), "SET NX");
        Ok(result.is_some())
    }

    async fn compare_and_mutate(
        &self,
        key: &str,
        expected: &str,
        op: GuardedOp,
    ) -> StoreResult<GuardedReply> {
        let mut args: Vec<RedisValue> = vec![expected.into()];
        if let GuardedOp::Expire(ttl) = op {
            args.push(expiry_millis(ttl).into());
        }

        let reply: RedisValue = self
            .bounded(
                "EVAL",
                self.client.eval(script_for(op), vec![key.to_string()], args),
            )
            .await?;

        debug!(key, ?op, ?reply, "EVAL");
        decode_reply(op, reply)
    }
}
