//! # hello
//!
//! A small HTTP service that stores a username with a date of birth and
//! greets the user with the number of days until their next birthday.
//!
//! ```text
//! PUT /hello/alice  {"dateOfBirth": "1990-05-17"}   → 204
//! GET /hello/alice                                  → 200 {"message": "Hello, alice! Your birthday is in 42 day(s)"}
//! ```
//!
//! ## Layers
//!
//! - [`validator`]: field → message accumulator.
//! - [`json`]: strict body decoding (size cap, unknown keys, trailing data)
//!   and uniform `{"message"|"error": ...}` encoding.
//! - [`api`]: handlers, plus [`ApiError`], which renders every failure.
//! - [`middleware`]: request span, metrics and panic recovery around the
//!   [`Router`].
//! - [`data`]: the [`User`](data::User) model, birthday arithmetic, and the
//!   [`UserStore`](data::UserStore) backends.
//! - [`server`]: hyper accept loop with graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hello::{Application, Metrics, Server};
//! use hello::data::MemoryUserStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hello::Error> {
//!     let app = Application::new("development", Arc::new(MemoryUserStore::new()), Arc::new(Metrics::new()));
//!     Server::bind(([127, 0, 0, 1], 4000).into()).serve(app.pipeline()).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod data;
pub mod json;
pub mod middleware;
pub mod validator;

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub use api::{ApiError, Application};
pub use config::Config;
pub use error::Error;
pub use handler::{Handler, with_state};
pub use middleware::{Metrics, Pipeline};
pub use request::{Body, BoxError, Request};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
