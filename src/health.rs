//! Liveness HTTP endpoint (§4.12).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use log::info;
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

/// Spawns the `/healthz` server on port 5000, returning immediately; the
/// server itself runs for the lifetime of the tokio runtime.
pub fn spawn_healthcheck_server(healthy: Arc<AtomicBool>) {
    let app = Router::new().route("/healthz", get(healthz)).with_state(healthy);
    let addr = SocketAddr::from(([0, 0, 0, 0], 5000));
    tokio::spawn(async move {
        info!("liveness endpoint listening on {}", addr);
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("failed to bind liveness endpoint on {}: {}", addr, e);
                return;
            }
        };
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("liveness endpoint exited: {}", e);
        }
    });
}

async fn healthz(State(healthy): State<Arc<AtomicBool>>) -> impl IntoResponse {
    if healthy.load(Ordering::Relaxed) {
        (StatusCode::OK, Json(HealthBody { status: "OK" }))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthBody { status: "UNHEALTHY" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthy_flag_returns_200() {
        let flag = Arc::new(AtomicBool::new(true));
        let response = healthz(State(flag)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unhealthy_flag_returns_503() {
        let flag = Arc::new(AtomicBool::new(false));
        let response = healthz(State(flag)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
