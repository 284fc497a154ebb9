//! JSON transport: strict request decoding and uniform response encoding.
//!
//! Reading enforces, in order: a 1 MiB body cap, rejection of empty bodies,
//! unknown keys, syntax errors, type mismatches and trailing values. Every
//! failure is a distinct [`ReadJsonError`] variant whose message is safe to
//! show to the client.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::BodyExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::request::{Body, BoxError};
use crate::response::Response;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Top-level response wrapper: `{"message": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope<T> {
    Message(T),
    Error(T),
}

/// Why a request body could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum ReadJsonError {
    #[error("body must not be larger than {mb}MB", mb = .limit / MAX_BODY_BYTES)]
    TooLarge { limit: usize },

    #[error("body contains unknown key \"{0}\"")]
    UnknownField(String),

    #[error("body contains badly-formed JSON (at character {offset})")]
    Syntax { offset: usize },

    /// The input ended in the middle of a value.
    #[error("body contains badly-formed JSON")]
    Truncated,

    #[error("body contains incorrect JSON type for field \"{field}\"")]
    FieldType { field: String },

    /// The top-level value had the wrong JSON type.
    #[error("body contains incorrect JSON type (at character {offset})")]
    TypeMismatch { offset: usize },

    /// The body was empty or whitespace.
    #[error("body must not be empty")]
    Empty,

    /// Something other than whitespace followed the first JSON value.
    #[error("body must only contain a single JSON value")]
    MultipleValues,

    #[error("body could not be read: {0}")]
    Body(#[source] BoxError),

    #[error("{0}")]
    Other(#[source] serde_json::Error),
}

/// Serialization of an outgoing payload failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode JSON response")]
pub struct EncodeError(#[from] serde_json::Error);

/// Reads at most [`MAX_BODY_BYTES`] from `body` and decodes them strictly.
///
/// The target type should carry `#[serde(deny_unknown_fields)]` for unknown
/// keys to be reported.
pub async fn read_json<T: DeserializeOwned>(mut body: Body) -> Result<T, ReadJsonError> {
    let mut buf = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(ReadJsonError::Body)?;
        if let Ok(data) = frame.into_data() {
            if buf.len() + data.len() > MAX_BODY_BYTES {
                return Err(ReadJsonError::TooLarge { limit: MAX_BODY_BYTES });
            }
            buf.extend_from_slice(&data);
        }
    }
    decode_json(&buf)
}

/// Decodes exactly one JSON value from an already-buffered body.
pub fn decode_json<T: DeserializeOwned>(input: &[u8]) -> Result<T, ReadJsonError> {
    if input.iter().all(u8::is_ascii_whitespace) {
        return Err(ReadJsonError::Empty);
    }

    let mut de = serde_json::Deserializer::from_slice(input);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|err| classify(input, err))?;
    de.end().map_err(|_| ReadJsonError::MultipleValues)?;
    Ok(value)
}

fn classify(input: &[u8], err: serde_path_to_error::Error<serde_json::Error>) -> ReadJsonError {
    let path = err.path().to_string();
    let inner = err.into_inner();
    let offset = byte_offset(input, inner.line(), inner.column());

    match inner.classify() {
        Category::Eof => ReadJsonError::Truncated,
        Category::Syntax => ReadJsonError::Syntax { offset },
        Category::Data => {
            let message = inner.to_string();
            if let Some(key) = unknown_field(&message) {
                ReadJsonError::UnknownField(key.to_owned())
            } else if !message.starts_with("invalid type") {
                ReadJsonError::Other(inner)
            } else if path == "." {
                ReadJsonError::TypeMismatch { offset }
            } else {
                ReadJsonError::FieldType { field: path }
            }
        }
        Category::Io => ReadJsonError::Other(inner),
    }
}

/// Pulls `foo` out of serde's "unknown field `foo`, expected ..." message.
/// Keys may contain backticks; the end is searched from the right.
fn unknown_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("unknown field `")?;
    let end = rest
        .rfind("`, expected ")
        .or_else(|| rest.rfind("`, there are no fields"))?;
    Some(&rest[..end])
}

/// Converts serde_json's 1-based line and column into a byte offset.
fn byte_offset(input: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = input
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    line_start + column
}

/// Serializes `data` as a JSON response with a trailing newline.
///
/// `headers` are copied onto the response first; `content-type` is always
/// `application/json`.
pub fn write_json<T>(status: StatusCode, data: &T, headers: HeaderMap) -> Result<Response, EncodeError>
where
    T: Serialize + ?Sized,
{
    let mut body = serde_json::to_vec(data)?;
    body.push(b'\n');
    Ok(Response::builder()
        .status(status)
        .headers(headers)
        .json(Bytes::from(body)))
}
