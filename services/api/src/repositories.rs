//! Repositories for database operations

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use common::error::DatabaseError;
use sqlx::PgPool;
use tracing::info;

use crate::models::{RegisterUser, User};

const USER_COLUMNS: &str = "id, name, username, email, role, password, created_at, updated_at";

/// Default role of a registered user
pub const DEFAULT_ROLE: &str = "user";

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user and return the stored row
    pub async fn create(&self, new_user: &RegisterUser) -> Result<User> {
        info!("Creating new user: {}", new_user.username);

        let password_hash = hash_password(&new_user.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, username, email, role, password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(new_user.role.as_deref().unwrap_or(DEFAULT_ROLE))
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(user)
    }

    /// Get all users
    pub async fn get_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(users)
    }

    /// Get one page of users together with the total row count
    pub async fn get_page(&self, limit: u32, offset: i64) -> Result<(Vec<User>, i64)> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok((users, count))
    }

    /// Find users by username.
    ///
    /// Returns at most one row, as a list.
    pub async fn find_by_username(&self, username: &str) -> Result<Vec<User>> {
        info!("Finding user by username: {}", username);

        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE username = $1
            LIMIT 1
            "#
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(users)
    }
}

/// Hash a password into an Argon2 PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(hash)
}

/// Whether a repository error was caused by a unique constraint violation
pub fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<DatabaseError>()
        .is_some_and(DatabaseError::is_unique_violation)
}
