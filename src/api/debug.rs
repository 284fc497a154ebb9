use std::sync::Arc;

use chrono::Utc;
use http::{HeaderMap, StatusCode};
use serde::Serialize;

use super::{ApiError, Application, VERSION};
use crate::data::PoolStats;
use crate::json::write_json;
use crate::middleware::MetricsSnapshot;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Serialize)]
struct Vars {
    version: &'static str,
    /// Unix seconds.
    timestamp: i64,
    metrics: MetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<PoolStats>,
}

impl Application {
    /// `GET /debug/vars`: build version, request counters and, for pooled
    /// stores, connection pool usage.
    pub async fn debug_vars(self: Arc<Self>, _req: Request) -> Result<Response, ApiError> {
        let vars = Vars {
            version: VERSION,
            timestamp: Utc::now().timestamp(),
            metrics: self.metrics.snapshot(),
            database: self.users.pool_stats(),
        };
        Ok(write_json(StatusCode::OK, &vars, HeaderMap::new())?)
    }
}
