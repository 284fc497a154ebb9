use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::header::{CONNECTION, HeaderValue};

use crate::api::ApiError;
use crate::request::BoxError;
use crate::response::{IntoResponse, Response};

/// A handler panicked while producing a response.
///
/// Keeps the payload's error value, when it had one, as the source.
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {message}")]
pub struct PanicError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl PanicError {
    /// Recovers what it can from a `catch_unwind` payload: the text of a
    /// `panic!`, or an error value raised with `std::panic::panic_any`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<String>() {
            Ok(message) => return Self::message(*message),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<&'static str>() {
            Ok(message) => return Self::message((*message).to_owned()),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<BoxError>() {
            Ok(err) => return Self::error(*err),
            Err(payload) => payload,
        };
        match payload.downcast::<std::io::Error>() {
            Ok(err) => Self::error(err),
            Err(_) => Self::message("unknown panic".to_owned()),
        }
    }

    fn message(message: String) -> Self {
        Self { message, source: None }
    }

    fn error(err: BoxError) -> Self {
        Self { message: err.to_string(), source: Some(err) }
    }
}

/// Runs `fut`, turning a panic into a `500` that also closes the connection.
///
/// The panic payload goes to the log only; the client sees the generic
/// server error body.
pub async fn recover<F>(fut: F) -> Response
where
    F: Future<Output = Response>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => {
            let mut res = ApiError::internal(PanicError::from_payload(payload)).into_response();
            res.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
            res
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http::header::CONTENT_TYPE;
    use rstest::rstest;

    #[tokio::test]
    async fn passes_through_normal_responses() {
        let res = recover(async { Response::status(StatusCode::NO_CONTENT) }).await;
        assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
        assert!(res.headers().get(CONNECTION).is_none());
    }

    #[tokio::test]
    async fn panic_becomes_500_with_connection_close() {
        let res = recover(async {
            if true {
                panic!("boom");
            }
            Response::status(StatusCode::OK)
        })
        .await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()[CONNECTION], "close");
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
        let body = String::from_utf8_lossy(res.body());
        assert!(!body.contains("boom"));
        assert!(body.contains("the server encountered a problem"));
    }

    #[tokio::test]
    async fn error_payload_becomes_500() {
        let res = recover(async {
            if true {
                std::panic::panic_any(std::io::Error::other("db down"));
            }
            Response::status(StatusCode::OK)
        })
        .await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()[CONNECTION], "close");
        assert!(!String::from_utf8_lossy(res.body()).contains("db down"));
    }

    #[rstest]
    #[case::static_str(Box::new("static"), "handler panicked: static", false)]
    #[case::string(Box::new(String::from("owned")), "handler panicked: owned", false)]
    #[case::boxed_error(
        Box::new(BoxError::from("database connection failed")),
        "handler panicked: database connection failed",
        true
    )]
    #[case::io_error(Box::new(std::io::Error::other("db down")), "handler panicked: db down", true)]
    #[case::other(Box::new(42_u8), "handler panicked: unknown panic", false)]
    fn payloads_become_panic_errors(
        #[case] payload: Box<dyn Any + Send>,
        #[case] expected: &str,
        #[case] has_source: bool,
    ) {
        let err = PanicError::from_payload(payload);
        assert_eq!(err.to_string(), expected);
        assert_eq!(std::error::Error::source(&err).is_some(), has_source);
    }
}
