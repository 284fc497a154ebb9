//! HTTP handlers and route table.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | `GET` | `/hello/{username}` | [`Application::get_birthday_message`] |
//! | `PUT` | `/hello/{username}` | [`Application::save_user`] |
//! | `GET` | `/healthcheck` | [`Application::healthcheck`] |
//! | `GET` | `/debug/vars` | [`Application::debug_vars`] |
//!
//! Handlers return `Result<Response, ApiError>`; every error is rendered by
//! [`ApiError`]'s `IntoResponse` impl.

use std::sync::Arc;

use crate::data::UserStore;
use crate::handler::with_state;
use crate::middleware::{Metrics, Pipeline};
use crate::request::Request;
use crate::response::IntoResponse;
use crate::router::Router;

mod debug;
mod error;
mod health;
mod users;

pub use error::{ApiError, error_response};

/// Build version reported by `/healthcheck` and `/debug/vars`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state behind every handler.
pub struct Application {
    environment: String,
    users: Arc<dyn UserStore>,
    metrics: Arc<Metrics>,
}

impl Application {
    pub fn new(
        environment: impl Into<String>,
        users: Arc<dyn UserStore>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        Arc::new(Self { environment: environment.into(), users, metrics })
    }

    pub fn routes(self: &Arc<Self>) -> Router {
        Router::new()
            .get("/hello/{username}", with_state(self, Self::get_birthday_message))
            .put("/hello/{username}", with_state(self, Self::save_user))
            .get("/healthcheck", with_state(self, Self::healthcheck))
            .get("/debug/vars", with_state(self, Self::debug_vars))
            .not_found(|_req: Request| async { ApiError::NotFound.into_response() })
            .method_not_allowed(|req: Request| async move {
                ApiError::MethodNotAllowed(req.method().clone()).into_response()
            })
    }

    /// The routes wrapped in the standard middleware chain.
    pub fn pipeline(self: &Arc<Self>) -> Pipeline {
        Pipeline::new(self.routes(), Arc::clone(&self.metrics))
    }
}
