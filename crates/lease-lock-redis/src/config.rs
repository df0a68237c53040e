//! Redis connection settings.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use fred::types::{ConnectionConfig, ReconnectPolicy, RedisConfig, ServerConfig};
use lease_lock_core::error::{LockError, LockResult};
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `LEASE_LOCK__REDIS__URL`.
pub const ENV_PREFIX: &str = "LEASE_LOCK";

/// Table holding the Redis settings in a configuration file.
pub const SETTINGS_KEY: &str = "redis";

/// Redis connection settings, usually loaded from the `[redis]` table of a
/// configuration file.
///
/// ```toml
/// [redis]
/// addrs = ["10.0.0.1:6379", "10.0.0.2:6379", "10.0.0.3:6379"]
/// password = "secret"
/// max_retries = 5
/// command_timeout_ms = 500
/// ```
///
/// `url` takes precedence over `addrs`. With `addrs`, one address selects a
/// single server, several select a cluster, and `master_name` selects
/// sentinel discovery through the listed sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub url: Option<String>,
    /// `host:port` pairs.
    pub addrs: Vec<String>,
    pub db: Option<u8>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sentinel service name.
    pub master_name: Option<String>,
    /// Reconnect attempts before giving up. Zero disables reconnection.
    pub max_retries: u32,
    pub min_retry_backoff_ms: u32,
    pub max_retry_backoff_ms: u32,
    pub connect_timeout_ms: Option<u64>,
    /// Upper bound on each lease round trip.
    pub command_timeout_ms: Option<u64>,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: None,
            addrs: vec![],
            db: None,
            username: None,
            password: None,
            master_name: None,
            max_retries: 3,
            min_retry_backoff_ms: 8,
            max_retry_backoff_ms: 512,
            connect_timeout_ms: None,
            command_timeout_ms: None,
        }
    }
}

impl RedisSettings {
    /// Settings for a single server URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Loads the `[redis]` table from `path`, then applies
    /// `LEASE_LOCK__REDIS__*` environment overrides.
    ///
    /// A missing file or table yields the defaults plus any overrides.
    pub fn load(path: impl AsRef<Path>) -> LockResult<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("redis.addrs"),
            )
            .build()
            .map_err(invalid_config)?;

        match config.get::<RedisSettings>(SETTINGS_KEY) {
            Ok(settings) => Ok(settings),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(invalid_config(e)),
        }
    }

    /// Builds the client configuration.
    pub fn redis_config(&self) -> LockResult<RedisConfig> {
        let mut config = match &self.url {
            Some(url) => RedisConfig::from_url(url)
                .map_err(|e| LockError::InvalidConfig(format!("invalid Redis URL: {}", e)))?,
            None => RedisConfig {
                server: self.server_config()?,
                ..RedisConfig::default()
            },
        };

        if self.username.is_some() {
            config.username = self.username.clone();
        }
        if self.password.is_some() {
            config.password = self.password.clone();
        }
        if self.db.is_some() {
            config.database = self.db;
        }
        Ok(config)
    }

    fn server_config(&self) -> LockResult<ServerConfig> {
        let hosts = self
            .addrs
            .iter()
            .map(|addr| parse_addr(addr))
            .collect::<LockResult<Vec<_>>>()?;

        if hosts.is_empty() {
            return Err(LockError::InvalidConfig(
                "no Redis url or addrs configured".to_string(),
            ));
        }

        if let Some(service_name) = &self.master_name {
            return Ok(ServerConfig::new_sentinel(hosts, service_name.clone()));
        }

        Ok(match hosts.as_slice() {
            [(host, port)] => ServerConfig::new_centralized(host.clone(), *port),
            _ => ServerConfig::new_clustered(hosts.clone()),
        })
    }

    /// Exponential reconnect policy, or `None` when reconnection is disabled.
    pub fn reconnect_policy(&self) -> Option<ReconnectPolicy> {
        (self.max_retries > 0).then(|| {
            ReconnectPolicy::new_exponential(
                self.max_retries,
                self.min_retry_backoff_ms,
                self.max_retry_backoff_ms,
                2,
            )
        })
    }

    pub fn connection_config(&self) -> Option<ConnectionConfig> {
        self.connect_timeout_ms.map(|ms| ConnectionConfig {
            connection_timeout: Duration::from_millis(ms),
            ..ConnectionConfig::default()
        })
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_addr(addr: &str) -> LockResult<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| LockError::InvalidConfig(format!("address without port: {}", addr)))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| LockError::InvalidConfig(format!("invalid port in {}: {}", addr, e)))?;
    if host.is_empty() {
        return Err(LockError::InvalidConfig(format!("address without host: {}", addr)));
    }
    Ok((host.to_string(), port))
}

fn invalid_config(err: ConfigError) -> LockError {
    LockError::InvalidConfig(err.to_string())
}
