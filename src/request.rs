//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

/// Boxed error carried by request bodies and unexpected failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A request body, type-erased so hyper's `Incoming` and in-memory test bodies
/// look the same to handlers.
pub type Body = UnsyncBoxBody<Bytes, BoxError>;

/// An incoming HTTP request with the path parameters of the matched route.
pub struct Request {
    parts: http::request::Parts,
    body: Body,
    params: HashMap<String, String>,
}

impl Request {
    /// Wraps any `http::Request` whose body yields [`Bytes`].
    pub fn from_http<B>(req: http::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        Self {
            parts,
            body: body.map_err(Into::into).boxed_unsync(),
            params: HashMap::new(),
        }
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn path(&self) -> &str { self.parts.uri.path() }

    /// Returns a named path parameter, percent-decoded.
    ///
    /// For a route `/hello/{username}`, `req.param("username")` on
    /// `/hello/J%61ne` returns `Some("Jane")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Consumes the request, handing over its body.
    pub fn into_body(self) -> Body {
        self.body
    }
}
