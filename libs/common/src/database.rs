//! PostgreSQL pool, migrations and health probe
//!
//! The pool is created once at startup and cloned into every handler.

use crate::error::{DatabaseError, DatabaseResult};
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::{env, str::FromStr, time::Duration};
use tracing::{error, info};

/// Pool settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connection_timeout: u64,
}

impl DatabaseConfig {
    /// Read the pool settings from the environment.
    ///
    /// `DATABASE_URL` is required. `DATABASE_MAX_CONNECTIONS` (10),
    /// `DATABASE_MIN_CONNECTIONS` (1) and `DATABASE_CONNECTION_TIMEOUT` (30 s)
    /// fall back to their defaults when unset or unparsable.
    pub fn from_env() -> DatabaseResult<Self> {
        let database_url = env::var("DATABASE_URL").map_err(|_| {
            DatabaseError::Configuration("DATABASE_URL environment variable not set".to_string())
        })?;

        Ok(Self {
            database_url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", 1),
            connection_timeout: env_or("DATABASE_CONNECTION_TIMEOUT", 30),
        })
    }

    fn connect_options(&self) -> DatabaseResult<PgConnectOptions> {
        self.database_url
            .parse()
            .map_err(|e| DatabaseError::Configuration(format!("Invalid database URL: {}", e)))
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(Duration::from_secs(self.connection_timeout))
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Connect a pool eagerly; fails when the database is unreachable
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<PgPool> {
    info!(
        max_connections = config.max_connections,
        "Connecting to PostgreSQL"
    );

    let pool = config
        .pool_options()
        .connect_with(config.connect_options()?)
        .await
        .map_err(DatabaseError::Connection)?;

    info!("PostgreSQL pool ready");
    Ok(pool)
}

/// Create a pool that only connects when a query first needs a connection.
///
/// Used by tests and tooling that build the router without a live database.
pub fn lazy_pool(config: &DatabaseConfig) -> DatabaseResult<PgPool> {
    Ok(config
        .pool_options()
        .connect_lazy_with(config.connect_options()?))
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    info!("Database migrations applied");
    Ok(())
}

/// Whether the database answers a trivial query
pub async fn health_check(pool: &PgPool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => true,
        Err(e) => {
            error!("Database health check failed: {}", e);
            false
        }
    }
}
