//! Connection configuration

use std::env;
use std::fmt;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

use crate::error::{Error, Result};

/// Administrative database every PostgreSQL server carries
pub const ADMIN_DATABASE: &str = "postgres";

/// Connection settings for the copy-trading database
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Target database, created on first start if absent
    pub database: String,
    /// Maximum pooled connections
    pub pool_size: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// Create a configuration with explicit values and default pool settings
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            pool_size: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    /// Read `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`,
    /// `DB_POOL_SIZE` and `DB_ACQUIRE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_env_prefixed("")
    }

    /// Same as [`DbConfig::from_env`] with every variable name prefixed,
    /// e.g. `TEST_` reads `TEST_DB_HOST`
    pub fn from_env_prefixed(prefix: &str) -> Result<Self> {
        let var = |name: &str| env::var(format!("{}{}", prefix, name)).ok();

        let port = match var("DB_PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| Error::Configuration(format!("invalid {}DB_PORT: {}", prefix, p)))?,
            None => 5432,
        };
        let pool_size = match var("DB_POOL_SIZE") {
            Some(s) => s.parse().map_err(|_| {
                Error::Configuration(format!("invalid {}DB_POOL_SIZE: {}", prefix, s))
            })?,
            None => 5,
        };
        let acquire_timeout = match var("DB_ACQUIRE_TIMEOUT_SECS") {
            Some(s) => Duration::from_secs(s.parse().map_err(|_| {
                Error::Configuration(format!("invalid {}DB_ACQUIRE_TIMEOUT_SECS: {}", prefix, s))
            })?),
            None => Duration::from_secs(5),
        };

        let config = Self {
            host: var("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port,
            user: var("DB_USER").unwrap_or_else(|| "postgres".to_string()),
            password: var("DB_PASSWORD").unwrap_or_default(),
            database: var("DB_NAME").unwrap_or_else(|| "hyperliquid_copy_trading".to_string()),
            pool_size,
            acquire_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Reject settings the server would only refuse later
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Configuration("host must not be empty".to_string()));
        }
        if self.database.is_empty() {
            return Err(Error::Configuration("database name must not be empty".to_string()));
        }
        // NAMEDATALEN - 1
        if self.database.len() > 63 {
            return Err(Error::Configuration(format!(
                "database name longer than 63 bytes: {}",
                self.database
            )));
        }
        if self.database.contains('\0') {
            return Err(Error::Configuration("database name contains NUL".to_string()));
        }
        if self.pool_size == 0 {
            return Err(Error::Configuration("pool size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Options for the administrative database used during bootstrap
    pub fn admin_options(&self) -> PgConnectOptions {
        self.base_options().database(ADMIN_DATABASE)
    }

    /// Options for the target database
    pub fn connect_options(&self) -> PgConnectOptions {
        self.base_options().database(&self.database)
    }

    fn base_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("pool_size", &self.pool_size)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}
