//! Process-level error type.

use std::time::Duration;

/// Failures that stop the service from starting or serving.
///
/// Per-request failures never surface here; they are rendered as HTTP
/// responses by [`ApiError`](crate::api::ApiError).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database connection not established within {0:?}")]
    ConnectTimeout(Duration),

    #[error("missing required DB_DSN (PostgreSQL DSN)")]
    MissingDsn,
}
