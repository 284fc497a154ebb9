use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

use super::{PoolStats, StoreError, User, UserStore};
use crate::config::DbConfig;
use crate::error::Error;

/// Upper bound on a single store call, pool acquisition included.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the connection pool and proves it reachable with one connection.
#[instrument(skip_all, fields(max_connections = config.max_open_conns))]
pub async fn open_pool(config: &DbConfig) -> Result<PgPool, Error> {
    let options = PgPoolOptions::new()
        .max_connections(config.max_open_conns)
        .min_connections(config.max_idle_conns.min(config.max_open_conns))
        .idle_timeout(config.max_idle_time)
        .acquire_timeout(CONNECT_TIMEOUT);

    let pool = tokio::time::timeout(CONNECT_TIMEOUT, options.connect(&config.dsn))
        .await
        .map_err(|_| Error::ConnectTimeout(CONNECT_TIMEOUT))??;

    info!("database connection pool established");
    Ok(pool)
}

/// [`UserStore`] over a `users(username text primary key, date_of_birth date)`
/// table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, timeout: QUERY_TIMEOUT }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, StoreError> {
        with_timeout(self.timeout, call).await
    }
}

/// Runs one database call, failing with [`StoreError::Timeout`] once `limit`
/// has passed.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
        .map_err(StoreError::from)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        let query = sqlx::query(
            "INSERT INTO users (username, date_of_birth) \
             VALUES ($1, $2) \
             ON CONFLICT (username) DO UPDATE SET date_of_birth = EXCLUDED.date_of_birth",
        )
        .bind(&user.username)
        .bind(user.date_of_birth)
        .execute(&self.pool);

        self.bounded(query).await?;
        Ok(())
    }

    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let query = sqlx::query_as::<_, (String, NaiveDate)>(
            "SELECT username, date_of_birth FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool);

        let (username, date_of_birth) = self.bounded(query).await?.ok_or(StoreError::NotFound)?;
        Ok(User { username, date_of_birth })
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        let open = self.pool.size();
        let idle = u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX);
        Some(PoolStats {
            max_open_connections: self.pool.options().get_max_connections(),
            open_connections: open,
            in_use: open.saturating_sub(idle),
            idle,
        })
    }
}
