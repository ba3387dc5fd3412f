//! Response handling for JSON exchanges.
//!
//! # Responsibilities
//! - Keep the request method and URL alongside the response for errors
//! - Decode a JSON response body into a typed value
//! - Turn non-success responses into [`WrongStatusError`]
//!
//! # Design Decisions
//! - Every consumer takes the response by value; the body is released
//!   when it returns, whatever the outcome

use axum::http::{Method, StatusCode};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use url::Url;

use crate::http::error::{DecodeError, HttpError, WrongStatusError};
use crate::http::request::decode;

/// Send `request` and keep its method with the response.
pub async fn send(client: &reqwest::Client, request: reqwest::Request) -> Result<Exchange, HttpError> {
    let method = request.method().clone();
    let url = request.url().to_string();

    tracing::debug!(method = %method, url = %url, "Sending request");
    let response = client
        .execute(request)
        .await
        .map_err(|source| HttpError::Send {
            method: method.clone(),
            url,
            source,
        })?;

    Ok(Exchange { method, response })
}

/// A response paired with the method of the request that produced it.
#[derive(Debug)]
pub struct Exchange {
    method: Method,
    response: reqwest::Response,
}

impl Exchange {
    pub fn new(method: Method, response: reqwest::Response) -> Self {
        Self { method, response }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Final URL of the exchange.
    pub fn url(&self) -> &Url {
        self.response.url()
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Pass through success responses; drain the rest into a [`WrongStatusError`].
    pub async fn error_for_status(self) -> Result<Self, WrongStatusError> {
        if self.status().is_success() {
            Ok(self)
        } else {
            Err(WrongStatusError::from_response(&self.method, self.response).await)
        }
    }

    /// Decode the body as one JSON value of type `T`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let url = self.response.url().to_string();
        let result = match self.response.bytes().await {
            Ok(bytes) => decode(&bytes[..]),
            Err(e) => Err(DecodeError::Body(Box::new(e))),
        };
        result.map_err(|source| HttpError::DecodeResponse {
            method: self.method,
            url,
            source,
        })
    }

    pub fn into_inner(self) -> reqwest::Response {
        self.response
    }
}

impl WrongStatusError {
    /// Drain and release `response`, capturing it as an error value.
    ///
    /// A body that fails to read is recorded as empty.
    pub async fn from_response(method: &Method, response: reqwest::Response) -> Self {
        let status = response.status();
        let url = response.url().to_string();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                tracing::debug!(error = %e, url = %url, "Failed to read error response body");
                Vec::new()
            }
        };
        Self::from_parts(method, url, status, body)
    }
}
