//! One-shot database bootstrap
//!
//! Connects to the server, creates the target database when it is missing,
//! opens the shared pool, enables UUID generation and brings the schema up
//! to date. Every step is idempotent so restarts re-detect existing state.

use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::{Connection, PgPool};
use tracing::{debug, info};

use super::config::DbConfig;
use super::schema;
use crate::error::{Error, ErrorExt, Result};

/// SQLSTATE raised by CREATE DATABASE when the database already exists
const DUPLICATE_DATABASE: &str = "42P04";

/// Owned handle to the provisioned database
///
/// Cloning is cheap; every clone shares the same connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Wrap an existing pool whose schema is managed elsewhere
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection. Pending acquisitions fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Provision the configured database and return a handle to it
pub async fn initialize(config: &DbConfig) -> Result<Database> {
    config.validate()?;
    info!(
        "Initializing database {} on {}:{}",
        config.database, config.host, config.port
    );

    let mut admin = PgConnection::connect_with(&config.admin_options())
        .await
        .with_context(|| "error opening administrative database connection")?;

    let created = ensure_database(&mut admin, &config.database).await;
    // The admin connection is only needed for the existence check.
    if let Err(e) = admin.close().await {
        debug!("Error closing administrative connection: {}", e);
    }
    if created? {
        info!("Database {} created", config.database);
    } else {
        info!("Database {} already exists, proceeding", config.database);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(config.connect_options())
        .await
        .with_context(|| format!("error opening database {}", config.database))?;

    ping(&pool)
        .await
        .with_context(|| "error pinging database")?;

    match sqlx::query(r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp""#)
        .execute(&pool)
        .await
    {
        Ok(_) => {}
        // A concurrent initializer inserted the catalog row first
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("uuid-ossp was enabled concurrently");
        }
        Err(e) => {
            return Err(Error::from(e)).with_context(|| "error enabling uuid-ossp extension");
        }
    }

    schema::ensure_schema(&pool)
        .await
        .with_context(|| "error creating schema")?;

    info!("Database initialized successfully");
    Ok(Database { pool })
}

/// Create `name` unless it exists. Returns whether it was created.
async fn ensure_database(admin: &mut PgConnection, name: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&mut *admin)
            .await
            .with_context(|| "error checking database existence")?;

    if exists {
        return Ok(false);
    }

    // CREATE DATABASE takes no bind parameters
    let statement = format!("CREATE DATABASE {}", quote_identifier(name));
    match sqlx::query(&statement).execute(&mut *admin).await {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(e))
            if e.code().as_deref() == Some(DUPLICATE_DATABASE) || e.is_unique_violation() =>
        {
            debug!("Database {} was created concurrently", name);
            Ok(false)
        }
        Err(e) => Err(Error::from(e)).with_context(|| format!("error creating database {}", name)),
    }
}

async fn ping(pool: &PgPool) -> Result<()> {
    let mut conn = pool.acquire().await?;
    conn.ping().await?;
    Ok(())
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
