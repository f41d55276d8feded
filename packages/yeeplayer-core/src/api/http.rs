//! HTTP routes for the relay.

use std::sync::atomic::Ordering;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::ws::ws_handler;
use crate::api::RelayState;
use crate::protocol_constants::SERVICE_ID;

/// Creates the relay router: `/health` and the `/ws` upgrade endpoint.
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/peers", get(list_peers))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check with relay counters.
async fn health_check(State(state): State<RelayState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.uptime_secs(),
        "peers": state.connections.connection_count(),
        "framesRelayed": state.stats.frames_relayed.load(Ordering::Relaxed),
        "framesRejected": state.stats.frames_rejected.load(Ordering::Relaxed),
    }))
}

async fn list_peers(State(state): State<RelayState>) -> impl IntoResponse {
    Json(state.connections.peers())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn health_reports_service_and_counters() {
        let state = RelayState::new(RelayConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(crate::api::serve(listener, state));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(SERVICE_ID));
        assert!(response.contains("\"peers\":0"));
    }
}
