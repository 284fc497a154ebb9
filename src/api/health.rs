//! Liveness probe.
//!
//! `GET /healthcheck` answers `200` whenever the process can serve HTTP at
//! all. It does not touch the database.

use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde::Serialize;

use super::{ApiError, Application, VERSION};
use crate::json::write_json;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Serialize)]
struct Health<'a> {
    status: &'static str,
    system_info: SystemInfo<'a>,
}

#[derive(Debug, Serialize)]
struct SystemInfo<'a> {
    environment: &'a str,
    version: &'static str,
}

impl Application {
    pub async fn healthcheck(self: Arc<Self>, _req: Request) -> Result<Response, ApiError> {
        let health = Health {
            status: "available",
            system_info: SystemInfo { environment: &self.environment, version: VERSION },
        };
        Ok(write_json(StatusCode::OK, &health, HeaderMap::new())?)
    }
}
