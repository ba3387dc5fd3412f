//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Path, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use graceful_http::config::ServerConfig;
use graceful_http::http::{decode_request, HttpServer};
use graceful_http::lifecycle::{Lifecycle, LifecycleError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email: Option<String>,
}

/// A server running under a lifecycle in a background task.
pub struct TestServer {
    pub addr: SocketAddr,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<Result<(), LifecycleError>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Cancel the run and wait for its result.
    #[allow(dead_code)]
    pub async fn stop(self) -> Result<(), LifecycleError> {
        self.cancel.cancel();
        self.handle.await.unwrap()
    }
}

/// Start the test routes on an ephemeral port, watching no OS signals.
pub async fn start_server(grace_period: Duration) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::with_listener(listener, &ServerConfig::default(), routes()).unwrap();
    let lifecycle = Lifecycle::new()
        .with_signals(std::iter::empty())
        .with_grace_period(grace_period);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move { lifecycle.run(&token, &server).await });

    TestServer { addr, cancel, handle }
}

pub fn routes() -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/text", get(|| async { "plain text" }))
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/slow/{ms}", get(slow))
}

async fn create_user(request: Request) -> Response {
    match decode_request::<User>(request, 64 * 1024).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn get_user(Path(id): Path<u32>) -> Response {
    if id == 1 {
        Json(User {
            id,
            name: "ada".to_string(),
            email: Some("ada@example.com".to_string()),
        })
        .into_response()
    } else {
        (StatusCode::NOT_FOUND, "not found").into_response()
    }
}

async fn slow(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "done"
}

/// A client that ignores proxy environment variables.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
