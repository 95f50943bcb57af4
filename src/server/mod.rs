//! HTTP/WebSocket server for browser access to research runs
//!
//! Serves the embedded browser shell over HTTP and streams run progress to
//! each client over one WebSocket channel.

mod static_files;
pub mod state;
mod ws;

pub use state::AppState;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Version information for the server
#[derive(serde::Serialize)]
struct VersionInfo {
    version: String,
}

/// Build the application router. Exposed separately so integration tests
/// can serve it on an ephemeral port.
pub fn build_router(state: AppState) -> Router {
    // Permissive CORS: the shell is same-origin, but external tooling may
    // poll the health and version endpoints.
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health_handler))
        .route("/api/version", get(version_handler))
        .fallback(static_files::serve_static)
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP/WebSocket server until shutdown is requested.
pub async fn run_server(port: u16, bind: &str, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", bind, port))?;

    let shutdown_state = state.shutdown.clone();
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    log::info!("Server listening on http://{}", addr);
    println!("Deep Research server running at http://{}", addr);
    println!("  GET  /           - browser shell");
    println!("  GET  /ws         - WebSocket research stream");
    println!("  GET  /health     - health check");

    // Poll the shutdown flag set by the signal handler thread.
    let shutdown_signal = async move {
        loop {
            if shutdown_state.is_shutdown_requested() {
                log::info!("Shutdown signal received, stopping server...");
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("server error")
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Version endpoint
async fn version_handler() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
