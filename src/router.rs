//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. A path that matches under
//! some other method is a `405` (with an `Allow` header); a path that matches
//! nowhere is a `404`. Both outcomes are rendered by replaceable fallback
//! handlers.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use http::header::{ALLOW, HeaderValue};
use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup and hand it to a
/// [`Pipeline`](crate::middleware::Pipeline). Registration methods return
/// `self` so calls chain.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    not_found: BoxedHandler,
    method_not_allowed: BoxedHandler,
}

enum Lookup {
    Found(BoxedHandler, HashMap<String, String>),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            not_found: (|_req: Request| async { StatusCode::NOT_FOUND }).into_boxed_handler(),
            method_not_allowed: (|_req: Request| async { StatusCode::METHOD_NOT_ALLOWED })
                .into_boxed_handler(),
        }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    /// Handler for paths no route matches.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = handler.into_boxed_handler();
        self
    }

    /// Handler for known paths requested with an unregistered method. The
    /// router adds the `Allow` header to whatever it returns.
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = handler.into_boxed_handler();
        self
    }

    /// Routes one request to its handler (or a fallback) and awaits the
    /// response.
    pub async fn handle(&self, req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Lookup::Found(handler, params) => handler.call(req.with_params(params)).await,
            Lookup::NotFound => self.not_found.call(req).await,
            Lookup::MethodNotAllowed(allowed) => {
                let mut res = self.method_not_allowed.call(req).await;
                if let Ok(allow) = HeaderValue::from_str(&allow_header(&allowed)) {
                    res.headers_mut().insert(ALLOW, allow);
                }
                res
            }
        }
    }

    fn lookup(&self, method: &Method, path: &str) -> Lookup {
        if let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) {
            let handler = Arc::clone(matched.value);
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), decode_param(v)))
                .collect();
            return Lookup::Found(handler, params);
        }

        let allowed: Vec<Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| method.clone())
            .collect();

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed)
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Percent-decodes a captured segment. Segments that do not decode to UTF-8
/// are passed on as sent.
fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_owned(), Cow::into_owned)
}

fn allow_header(methods: &[Method]) -> String {
    let mut names: Vec<&str> = methods.iter().map(Method::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    fn request(method: Method, path: &str) -> Request {
        Request::from_http(
            http::Request::builder()
                .method(method)
                .uri(path)
                .body(Full::new(Bytes::new()))
                .unwrap(),
        )
    }

    async fn echo_username(req: Request) -> Response {
        let username = req.param("username").unwrap_or("missing");
        Response::json(format!(r#"{{"username":"{username}"}}"#))
    }

    fn router() -> Router {
        Router::new()
            .get("/hello/{username}", echo_username)
            .put("/hello/{username}", |_req: Request| async { StatusCode::NO_CONTENT })
    }

    #[tokio::test]
    async fn matched_route_receives_path_params() {
        let res = router().handle(request(Method::GET, "/hello/alice")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body().as_ref(), br#"{"username":"alice"}"#);
    }

    #[tokio::test]
    async fn path_params_are_percent_decoded() {
        let res = router().handle(request(Method::GET, "/hello/J%61ne")).await;
        assert_eq!(res.body().as_ref(), br#"{"username":"Jane"}"#);
    }

    #[tokio::test]
    async fn undecodable_params_pass_through() {
        let res = router().handle(request(Method::GET, "/hello/%FF")).await;
        assert_eq!(res.body().as_ref(), br#"{"username":"%FF"}"#);
    }

    #[tokio::test]
    async fn known_path_with_other_method_is_405_with_allow() {
        let res = router().handle(request(Method::DELETE, "/hello/alice")).await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "GET, PUT");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let res = router().handle(request(Method::GET, "/goodbye")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fallbacks_can_be_replaced() {
        let res = router()
            .not_found(|_req: Request| async { StatusCode::GONE })
            .handle(request(Method::GET, "/hello"))
            .await;
        assert_eq!(res.status_code(), StatusCode::GONE);
    }
}
