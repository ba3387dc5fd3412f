//! Demo server for the graceful HTTP helpers.
//!
//! ```text
//!   SIGINT/SIGTERM ──▶ Lifecycle ──shutdown──▶ HttpServer ──▶ Router
//!                          ▲                                  ├─ GET  /health
//!                          └────────serve────────────────────└─ POST /echo
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use graceful_http::config::{apply_overrides, load_config, Config, ConfigOverrides};
use graceful_http::http::{decode_request, HttpServer};
use graceful_http::lifecycle::Lifecycle;
use graceful_http::observability::init_logging;

#[derive(Parser)]
#[command(name = "graceful-http")]
#[command(about = "JSON echo server with graceful shutdown", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Clone)]
struct AppState {
    max_body_bytes: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting with error");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let config = apply_overrides(
        config,
        ConfigOverrides {
            bind_address: args.bind,
        },
    )?;

    init_logging(&config.logging)?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        grace_period_secs = config.shutdown.grace_period_secs,
        signals = ?config.shutdown.signals,
        "Configuration loaded"
    );

    let state = AppState {
        max_body_bytes: config.server.max_body_bytes,
    };
    let router = Router::new()
        .route("/health", get(health))
        .route("/echo", post(echo))
        .with_state(state);

    let server = HttpServer::new(&config.server, router);
    let lifecycle = Lifecycle::from_config(&config.shutdown);
    lifecycle.run(&CancellationToken::new(), &server).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn echo(State(state): State<AppState>, request: Request) -> Response {
    match decode_request::<Value>(request, state.max_body_bytes).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected echo request");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}
