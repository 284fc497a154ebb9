//! Error responses.
//!
//! Every failure becomes `{"error": ...}` with `content-type:
//! application/json`. Client mistakes echo their cause; unexpected failures
//! are logged in full and answered with a fixed message.

use std::collections::BTreeMap;
use std::error::Error as _;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::data::StoreError;
use crate::json::{EncodeError, Envelope, ReadJsonError, write_json};
use crate::request::BoxError;
use crate::response::{IntoResponse, Response};

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// A request that could not be served.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body or unusable input; the message is shown to the client.
    #[error("{0}")]
    BadRequest(String),

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    /// Field name → reason.
    #[error("failed validation")]
    FailedValidation(BTreeMap<String, String>),

    /// Anything unexpected. Logged, never shown.
    #[error("{SERVER_ERROR_MESSAGE}")]
    Internal(#[source] BoxError),
}

impl ApiError {
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::FailedValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ReadJsonError> for ApiError {
    fn from(err: ReadJsonError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            other => Self::internal(other),
        }
    }
}

impl From<EncodeError> for ApiError {
    fn from(err: EncodeError) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::FailedValidation(errors) => Value::from_iter(errors),
            Self::Internal(err) => {
                error!(error = %err, source = ?err.source(), "internal error");
                Value::from(SERVER_ERROR_MESSAGE)
            }
            other => Value::from(other.to_string()),
        };
        error_response(status, message)
    }
}

/// Writes `{"error": message}` with `status`.
///
/// If `message` itself fails to serialize, the client still gets a JSON 500.
pub fn error_response<T: Serialize>(status: StatusCode, message: T) -> Response {
    match write_json(status, &Envelope::Error(message), HeaderMap::new()) {
        Ok(res) => res,
        Err(err) => {
            error!(error = %err, "failed to encode error response");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .json(Bytes::from(format!("{{\"error\":\"{SERVER_ERROR_MESSAGE}\"}}\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use rstest::rstest;
    use serde_json::json;

    fn body(res: &Response) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[rstest]
    #[case::string(StatusCode::BAD_REQUEST, json!("invalid input"))]
    #[case::map(StatusCode::UNPROCESSABLE_ENTITY, json!({"field": "error"}))]
    #[case::number(StatusCode::INTERNAL_SERVER_ERROR, json!(500))]
    fn error_response_wraps_any_message(#[case] status: StatusCode, #[case] message: Value) {
        let res = error_response(status, &message);

        assert_eq!(res.status_code(), status);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body(&res), json!({ "error": message }));
    }

    #[test]
    fn internal_error_hides_the_cause() {
        let res = ApiError::internal("database password is wrong").into_response();

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
        let message = body(&res)["error"].as_str().unwrap().to_owned();
        assert_eq!(message, SERVER_ERROR_MESSAGE);
        assert!(!message.contains("password"));
    }

    #[test]
    fn bad_request_exposes_the_cause() {
        let res = ApiError::BadRequest("validation failed: email format".into()).into_response();
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "validation failed: email format");
    }

    #[rstest]
    #[case::with_errors(&[("username", "must contain only letters"), ("dateOfBirth", "must be in the past")])]
    #[case::empty(&[])]
    fn failed_validation_returns_field_map(#[case] fields: &[(&str, &str)]) {
        let errors: BTreeMap<String, String> = fields.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let res = ApiError::FailedValidation(errors.clone()).into_response();

        assert_eq!(res.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body(&res)["error"], serde_json::to_value(&errors).unwrap());
    }

    #[test]
    fn not_found_and_method_not_allowed_messages() {
        let res = ApiError::NotFound.into_response();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["error"], "the requested resource could not be found");

        let res = ApiError::MethodNotAllowed(Method::POST).into_response();
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body(&res)["error"], "the POST method is not supported for this resource");
    }

    #[test]
    fn store_errors_map_to_404_or_500() {
        assert!(matches!(ApiError::from(StoreError::NotFound), ApiError::NotFound));
        let timeout = StoreError::Timeout(std::time::Duration::from_secs(3));
        assert_eq!(ApiError::from(timeout).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn transport_errors_are_bad_requests() {
        let err = ApiError::from(ReadJsonError::Empty);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "body must not be empty");
    }
}
