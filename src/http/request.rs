//! Request construction and JSON payload decoding.
//!
//! # Responsibilities
//! - Build outgoing requests with an optional JSON body
//! - Decode one JSON value from any body (client or server side)
//! - Join a base URL and a path segment
//!
//! # Design Decisions
//! - The body is serialized before the URL is parsed, so encode errors win
//! - Readers are taken by value and released on every path
//! - Cancellation is by dropping the future that sends the request

use std::io::{BufReader, Read};
use std::time::Duration;

use axum::http::Method;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::http::error::{DecodeError, HttpError};

/// Build a request for `method` and `url`, serializing `body` as JSON if given.
pub fn new_request<T>(method: Method, url: &str, body: Option<&T>) -> Result<reqwest::Request, HttpError>
where
    T: Serialize + ?Sized,
{
    let payload = match body {
        Some(value) => Some(serde_json::to_vec(value).map_err(|source| HttpError::Encode {
            method: method.clone(),
            url: url.to_string(),
            source,
        })?),
        None => None,
    };

    let parsed = Url::parse(url).map_err(|source| HttpError::CreateRequest {
        method: method.clone(),
        url: url.to_string(),
        source,
    })?;

    let mut request = reqwest::Request::new(method, parsed);
    if let Some(bytes) = payload {
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(bytes.into());
    }
    Ok(request)
}

/// Build a request without a body.
pub fn new_empty_request(method: Method, url: &str) -> Result<reqwest::Request, HttpError> {
    new_request::<()>(method, url, None)
}

/// Like [`new_request`], with a total timeout applied when sent.
pub fn new_request_with_timeout<T>(
    method: Method,
    url: &str,
    body: Option<&T>,
    timeout: Duration,
) -> Result<reqwest::Request, HttpError>
where
    T: Serialize + ?Sized,
{
    let mut request = new_request(method, url, body)?;
    *request.timeout_mut() = Some(timeout);
    Ok(request)
}

/// Decode one JSON value from `reader`. Anything after the first value is ignored.
///
/// The reader is buffered internally, so bytes past the first value may be consumed.
pub fn decode<T, R>(reader: R) -> Result<T, DecodeError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut values = serde_json::Deserializer::from_reader(BufReader::new(reader)).into_iter::<T>();
    match values.next() {
        Some(value) => Ok(value?),
        None => Err(DecodeError::Eof),
    }
}

/// Decode the JSON body of an incoming request, reading at most `limit` bytes.
pub async fn decode_request<T>(request: axum::extract::Request, limit: usize) -> Result<T, HttpError>
where
    T: DeserializeOwned,
{
    let method = request.method().clone();
    let url = request.uri().to_string();

    let result = match axum::body::to_bytes(request.into_body(), limit).await {
        Ok(bytes) => decode(&bytes[..]),
        Err(e) => Err(DecodeError::Body(Box::new(e))),
    };
    result.map_err(|source| HttpError::DecodeRequest { method, url, source })
}

/// Append `path` to `base` with exactly one separating slash.
///
/// `join_url("https://example.com/api", "/user/create")` yields
/// `https://example.com/api/user/create`.
pub fn join_url(base: &str, path: &str) -> Result<Url, HttpError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|source| HttpError::Url {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct CreateUser {
        name: String,
        age: u32,
        tags: Vec<String>,
    }

    fn sample() -> CreateUser {
        CreateUser {
            name: "ada".to_string(),
            age: 36,
            tags: vec!["admin".to_string()],
        }
    }

    #[test]
    fn join_url_adds_single_slash() {
        let expected = "https://example.com/api/user/create";
        assert_eq!(
            join_url("https://example.com/api", "/user/create").unwrap().as_str(),
            expected
        );
        assert_eq!(
            join_url("https://example.com/api", "user/create").unwrap().as_str(),
            expected
        );
        assert_eq!(
            join_url("https://example.com/api/", "/user/create").unwrap().as_str(),
            expected
        );
    }

    #[test]
    fn join_url_error_names_path() {
        let err = join_url("not a url", "/user").unwrap_err();
        assert!(matches!(err, HttpError::Url { .. }));
        assert!(err.to_string().contains("[/user]"));
    }

    #[test]
    fn request_body_decodes_back_to_value() {
        let request = new_request(Method::POST, "https://example.com/api/user", Some(&sample())).unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        let decoded: CreateUser = decode(bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn request_without_body_has_no_content_type() {
        let request = new_empty_request(Method::GET, "https://example.com/api/user/1").unwrap();
        assert!(request.body().is_none());
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn timeout_is_attached() {
        let request = new_request_with_timeout(
            Method::DELETE,
            "https://example.com/api/user/1",
            None::<&()>,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(request.timeout(), Some(&Duration::from_secs(5)));
    }

    #[test]
    fn malformed_url_reports_method_and_url() {
        let err = new_empty_request(Method::PUT, "::nope").unwrap_err();
        assert!(matches!(err, HttpError::CreateRequest { .. }));
        assert!(err.to_string().contains("[PUT ::nope]"));
    }

    #[test]
    fn unserializable_body_reports_method_and_url() {
        use std::collections::HashMap;
        // JSON object keys must be strings.
        let mut body = HashMap::new();
        body.insert(vec![1u8], 1);

        let err = new_request(Method::POST, "https://example.com/x", Some(&body)).unwrap_err();
        assert!(matches!(err, HttpError::Encode { .. }));
        assert!(err.to_string().contains("[POST https://example.com/x]"));
    }

    #[test]
    fn decode_reads_only_first_value() {
        let value: CreateUser =
            decode(&br#"{"name":"ada","age":36,"tags":["admin"]} {"ignored":true}"#[..]).unwrap();
        assert_eq!(value, sample());
    }

    #[test]
    fn decode_buffers_unbuffered_readers() {
        struct CountingReader<R> {
            inner: R,
            reads: usize,
        }

        impl<R: Read> Read for CountingReader<R> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.reads += 1;
                self.inner.read(buf)
            }
        }

        let payload = format!(r#"{{"name":"{}","age":1,"tags":[]}}"#, "a".repeat(2000));
        let mut reader = CountingReader {
            inner: payload.as_bytes(),
            reads: 0,
        };
        let user: CreateUser = decode(&mut reader).unwrap();

        assert_eq!(user.name.len(), 2000);
        assert!(reader.reads < 10, "{} reads for {} bytes", reader.reads, payload.len());
    }

    #[test]
    fn decode_empty_input_is_eof() {
        let err = decode::<CreateUser, _>(&b"  \n"[..]).unwrap_err();
        assert!(matches!(err, DecodeError::Eof));
    }

    #[test]
    fn decode_type_mismatch_is_json_error() {
        let err = decode::<CreateUser, _>(&br#"{"name":1}"#[..]).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[tokio::test]
    async fn decode_request_reads_body() {
        let body = serde_json::to_vec(&sample()).unwrap();
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/users")
            .body(Body::from(body))
            .unwrap();

        let decoded: CreateUser = decode_request(request, 1024).await.unwrap();
        assert_eq!(decoded, sample());
    }

    #[tokio::test]
    async fn decode_request_error_names_exchange() {
        let request = axum::http::Request::builder()
            .method(Method::PATCH)
            .uri("/users/9")
            .body(Body::from("{broken"))
            .unwrap();

        let err = decode_request::<CreateUser>(request, 1024).await.unwrap_err();
        assert!(matches!(err, HttpError::DecodeRequest { .. }));
        assert!(err.to_string().starts_with("unmarshal request for [PATCH /users/9]"));
    }

    #[tokio::test]
    async fn decode_request_enforces_limit() {
        let body = serde_json::to_vec(&sample()).unwrap();
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/users")
            .body(Body::from(body))
            .unwrap();

        let err = decode_request::<CreateUser>(request, 4).await.unwrap_err();
        assert!(matches!(
            err,
            HttpError::DecodeRequest { source: DecodeError::Body(_), .. }
        ));
    }
}
