//! Health status endpoint
//!
//! Read-only HTTP view of a [`HealthRegistry`]:
//!
//! ```text
//! GET /health              overall level + every component
//! GET /health/{component}  one component (404 if never reported)
//! GET /metrics             Prometheus text exposition
//! ```
//!
//! `/health` answers 503 while any component is critical so it can back a
//! load-balancer or Kubernetes readiness probe.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::metrics::health::{ComponentStatus, HealthComponent, HealthLevel, HealthRegistry};

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthLevel,
    pub version: String,
    pub components: BTreeMap<String, ComponentStatus>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn status_code(level: HealthLevel) -> StatusCode {
    match level {
        HealthLevel::Critical => StatusCode::SERVICE_UNAVAILABLE,
        // Warning and Unknown keep the process in rotation while it warms up.
        _ => StatusCode::OK,
    }
}

/// Build the status router over `registry`
pub fn router(registry: HealthRegistry) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/{component}", get(component_health))
        .route("/metrics", get(metrics_text))
        .with_state(registry)
        .layer(TraceLayer::new_for_http())
}

/// Bind the status listener
///
/// Done before any background work starts so a taken port fails startup
/// instead of leaving the process running without a status endpoint.
pub async fn bind(addr: SocketAddr) -> crate::error::Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| {
        crate::error::Error::with_source(
            format!("failed to bind health status endpoint on {addr}: {e}"),
            e,
        )
    })
}

/// Serve the status router on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    registry: HealthRegistry,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> crate::error::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Serving health status on {}", addr);
    }

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Health status server shutdown complete");
    Ok(())
}

async fn health_check(State(registry): State<HealthRegistry>) -> impl IntoResponse {
    let overall = registry.overall();
    let components = registry
        .snapshot()
        .into_iter()
        .map(|(component, status)| (component.to_string(), status))
        .collect();

    let response = HealthResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION").to_string(),
        components,
    };

    (status_code(overall), Json(response))
}

async fn component_health(
    State(registry): State<HealthRegistry>,
    Path(name): Path<String>,
) -> Response {
    let component = match name.parse::<HealthComponent>() {
        Ok(component) => component,
        Err(e) => {
            return (StatusCode::NOT_FOUND, Json(ErrorBody { error: e.to_string() })).into_response();
        }
    };

    match registry.get_status(component) {
        Some(status) => (status_code(status.level), Json(status)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no status reported for {component}"),
            }),
        )
            .into_response(),
    }
}

async fn metrics_text() -> Response {
    match crate::metrics::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(HealthLevel::Ok), StatusCode::OK);
        assert_eq!(status_code(HealthLevel::Warning), StatusCode::OK);
        assert_eq!(status_code(HealthLevel::Unknown), StatusCode::OK);
        assert_eq!(status_code(HealthLevel::Critical), StatusCode::SERVICE_UNAVAILABLE);
    }
}
