//! User persistence.
//!
//! Handlers talk to a [`UserStore`]; [`PgUserStore`] is the production
//! implementation and [`MemoryUserStore`] backs the tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

mod memory;
mod postgres;
mod user;

pub use memory::MemoryUserStore;
pub use postgres::{PgUserStore, QUERY_TIMEOUT, open_pool};
pub use user::{DATE_FORMAT, User, days_until_birthday, parse_date, validate_user, validate_user_on};

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("database call timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// User records keyed by username.
///
/// `upsert` must be a single atomic insert-or-update so that concurrent
/// writers for one username cannot interleave.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts `user`, or replaces the date of birth of an existing record.
    async fn upsert(&self, user: &User) -> Result<(), StoreError>;

    /// Exact-match lookup; [`StoreError::NotFound`] when absent.
    async fn get_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// Connection pool usage, for stores backed by one.
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }
}

/// Connection pool usage, published at `/debug/vars` under `"database"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub max_open_connections: u32,
    pub open_connections: u32,
    pub in_use: u32,
    pub idle: u32,
}
