//! Common library for the starter application
//!
//! This crate provides shared functionality used by the services of the
//! application: database connectivity and migrations, database error
//! handling, and the uniform `{code, message, data}` response envelope.

pub mod database;
pub mod error;
pub mod response;

pub use response::{ApiResponse, Page, PageMeta};

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     run_migrations(&pool).await?;
///     println!("Database health check: {}", health_check(&pool).await);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
