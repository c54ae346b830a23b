//! HTTP bootstrap listener.
//!
//! Only used to check that a deployment is reachable: `POST /` echoes the
//! request body, everything else is a 404.

use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

const NOT_FOUND_BODY: &str = "Only POST at / is supported";

/// Routes served by the bootstrap listener
pub fn router() -> Router {
    Router::new()
        .route("/", post(echo).fallback(not_found))
        .fallback(not_found)
}

async fn echo(body: String) -> String {
    component_debug!("bootstrap", "Received POST with {} bytes", body.len());
    format!("Received POST request with body: {}", body)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Serve until ctrl-c
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind bootstrap listener on {}: {}", addr, e))?;

    component_info!("bootstrap", "Server listening on port {}", port);

    axum::serve(listener, router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            component_info!("bootstrap", "Received interrupt, shutting down");
        })
        .await?;

    Ok(())
}
