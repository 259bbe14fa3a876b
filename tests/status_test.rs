//! HTTP tests for the health status endpoint

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use pelican_advertise::metrics::health::{HealthComponent, HealthLevel, HealthRegistry};
use pelican_advertise::status::{self, router};

async fn get(registry: &HealthRegistry, uri: &str) -> (StatusCode, Value) {
    let response = router(registry.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_reports_components() {
    let registry = HealthRegistry::new();
    registry.set_status(HealthComponent::Federation, HealthLevel::Warning, "starting");

    let (status, body) = get(&registry, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "warning");
    assert_eq!(body["components"]["federation"]["status"], "warning");
    assert_eq!(body["components"]["federation"]["message"], "starting");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_unavailable_when_critical() {
    let registry = HealthRegistry::new();
    registry.set_status(
        HealthComponent::Federation,
        HealthLevel::Critical,
        "Server failed to advertise to the director: boom",
    );

    let (status, body) = get(&registry, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "critical");
}

#[tokio::test]
async fn test_component_endpoint() {
    let registry = HealthRegistry::new();
    registry.set_status(HealthComponent::Federation, HealthLevel::Warning, "First attempt");

    let (status, body) = get(&registry, "/health/federation").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "warning");
    assert_eq!(body["message"], "First attempt");
    assert!(body["last_update"].is_string());
}

#[tokio::test]
async fn test_component_not_found() {
    let registry = HealthRegistry::new();

    let (status, _) = get(&registry, "/health/federation").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&registry, "/health/xrootd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("xrootd"));
}

/// A taken port fails at bind time, before anything is spawned
#[tokio::test]
async fn test_bind_reports_taken_port() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let err = status::bind(addr).await.unwrap_err();
    assert!(err.to_string().contains(&addr.to_string()));
}

/// The status server answers on a bound listener and stops on shutdown
#[tokio::test]
async fn test_serve_until_shutdown() {
    let listener = status::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let registry = HealthRegistry::new();
    registry.set_status(HealthComponent::Federation, HealthLevel::Ok, "");

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(status::serve(listener, registry, async move {
        let _ = rx.await;
    }));

    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    tx.send(()).unwrap();
    assert!(server.await.unwrap().is_ok());
}
