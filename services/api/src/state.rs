//! Application state shared across handlers

use sqlx::PgPool;

use crate::{config::RunMode, repositories::UserRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub user_repository: UserRepository,
    pub run_mode: RunMode,
}

impl AppState {
    pub fn new(db_pool: PgPool, run_mode: RunMode) -> Self {
        Self {
            user_repository: UserRepository::new(db_pool.clone()),
            db_pool,
            run_mode,
        }
    }
}
