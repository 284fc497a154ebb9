//! Middleware layer.
//!
//! Every request passes through the same chain before reaching its route:
//!
//! ```text
//! request span ─▶ metrics ─▶ panic recovery ─▶ router ─▶ handler
//! ```
//!
//! The chain is fixed; [`Pipeline`] is what the server calls per request.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{Instrument, debug, info_span};

use crate::request::{BoxError, Request};
use crate::response::Response;
use crate::router::Router;

mod metrics;
mod recover;

use metrics::micros;

pub use metrics::{Metrics, MetricsSnapshot};
pub use recover::{PanicError, recover};

/// A router wrapped in the request span, metrics and panic recovery.
pub struct Pipeline {
    router: Router,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(router: Router, metrics: Arc<Metrics>) -> Self {
        Self { router, metrics }
    }

    /// Serves one request. Never fails: every outcome is a [`Response`].
    pub async fn handle<B>(&self, req: http::Request<B>) -> Response
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let span = info_span!("request", method = %req.method(), uri = %req.uri());
        let start = Instant::now();

        async move {
            self.metrics.request_received();
            let res = recover(self.router.handle(Request::from_http(req))).await;

            let elapsed = start.elapsed();
            self.metrics.response_sent(res.status_code(), elapsed);
            debug!(status = res.status_code().as_u16(), elapsed_us = micros(elapsed), "response");
            res
        }
        .instrument(span)
        .await
    }
}
