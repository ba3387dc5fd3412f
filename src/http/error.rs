//! Error types for JSON request/response helpers.

use axum::http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while building, sending, or decoding JSON exchanges.
///
/// Every variant that concerns a single exchange names its method and URL.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The body value could not be serialized.
    #[error("encode body for [{method} {url}]: {source}")]
    Encode {
        method: Method,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request could not be constructed (malformed URL).
    #[error("create request for [{method} {url}]: {source}")]
    CreateRequest {
        method: Method,
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request could not be sent or the response headers not read.
    #[error("send request for [{method} {url}]: {source}")]
    Send {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A response body did not decode into the target type.
    #[error("unmarshal response for [{method} {url}]: {source}")]
    DecodeResponse {
        method: Method,
        url: String,
        #[source]
        source: DecodeError,
    },

    /// An incoming request body did not decode into the target type.
    #[error("unmarshal request for [{method} {url}]: {source}")]
    DecodeRequest {
        method: Method,
        url: String,
        #[source]
        source: DecodeError,
    },

    /// A joined URL did not parse.
    #[error("parse url [{path}]: {source}")]
    Url {
        path: String,
        #[source]
        source: url::ParseError,
    },

    /// The server answered with a non-success status.
    #[error("{0}")]
    Status(#[from] WrongStatusError),
}

/// Failure to decode one JSON value from a body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body held no JSON value.
    #[error("unexpected end of input")]
    Eof,

    /// The body could not be read.
    #[error("read body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A completed exchange whose status code was not a success.
///
/// Captured once, after the body has been drained, and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error(
    "wrong status code for [{request_method} {request_url}]; Code: [{response_status_code}] with response [{}]",
    String::from_utf8_lossy(.response_body)
)]
pub struct WrongStatusError {
    pub response_body: Vec<u8>,
    pub response_status_code: u16,
    pub request_url: String,
    pub request_method: String,
}

impl WrongStatusError {
    /// Build from already-collected parts.
    pub fn from_parts(
        method: &Method,
        url: impl Into<String>,
        status: StatusCode,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            response_body: body.into(),
            response_status_code: status.as_u16(),
            request_url: url.into(),
            request_method: method.to_string(),
        }
    }

    /// Status code as a typed value, if it is a valid one.
    pub fn status(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.response_status_code).ok()
    }

    /// Response body decoded lossily as UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.response_body).into_owned()
    }

    /// Find a `WrongStatusError` in `err` or anywhere in its source chain.
    pub fn find(err: &(dyn std::error::Error + 'static)) -> Option<WrongStatusError> {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(found) = e.downcast_ref::<WrongStatusError>() {
                return Some(found.clone());
            }
            current = e.source();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> WrongStatusError {
        WrongStatusError::from_parts(
            &Method::GET,
            "https://example.com/api/user/7",
            StatusCode::NOT_FOUND,
            "not found",
        )
    }

    #[test]
    fn message_renders_all_fields() {
        let text = not_found().to_string();
        assert!(text.contains("GET"));
        assert!(text.contains("https://example.com/api/user/7"));
        assert!(text.contains("404"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn find_sees_through_wrapping() {
        #[derive(Debug, Error)]
        #[error("load user")]
        struct LoadUser(#[source] HttpError);

        let wrapped = LoadUser(HttpError::Status(not_found()));
        let found = WrongStatusError::find(&wrapped).unwrap();
        assert_eq!(found, not_found());
        assert_eq!(found.status(), Some(StatusCode::NOT_FOUND));

        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(not_found());
        assert!(WrongStatusError::find(boxed.as_ref()).is_some());
    }

    #[test]
    fn find_ignores_unrelated_errors() {
        let err = std::io::Error::other("connection reset");
        assert!(WrongStatusError::find(&err).is_none());

        let err = HttpError::Url {
            path: "x".to_string(),
            source: url::ParseError::EmptyHost,
        };
        assert!(WrongStatusError::find(&err).is_none());
    }

    #[test]
    fn serializes_with_field_names() {
        let json = serde_json::to_value(not_found()).unwrap();
        assert_eq!(json["response_status_code"], 404);
        assert_eq!(json["request_method"], "GET");
    }
}
