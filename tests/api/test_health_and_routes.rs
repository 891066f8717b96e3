// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route registration and health endpoint tests

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use pill_identifier::api::{create_router, AppState};
use pill_identifier::registry::{PublicDataRegistry, DEFAULT_REGISTRY_TIMEOUT};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

use crate::common::{analyzer, FixedDetector, MapRegistry, WidthClassifier};

fn app() -> Router {
    create_router(AppState::new(analyzer(
        FixedDetector(vec![]),
        Arc::new(WidthClassifier::new([])),
        Arc::new(MapRegistry::default()),
    )))
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_backends() {
    let response = app().oneshot(request(Method::GET, "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["detector"], "fixed");
    assert_eq!(json["classifier"], "width");
    assert_eq!(json["registry"], "map");
    assert_eq!(json["classifier_configured"], true);
    assert_eq!(json["registry_configured"], true);
    assert_eq!(json["snapshots_enabled"], false);
}

#[tokio::test]
async fn test_health_degraded_without_registry_key() {
    let registry =
        PublicDataRegistry::new("http://127.0.0.1:9/items", None, DEFAULT_REGISTRY_TIMEOUT)
            .unwrap();
    let app = create_router(AppState::new(analyzer(
        FixedDetector(vec![]),
        Arc::new(WidthClassifier::new([])),
        Arc::new(registry),
    )));

    let response = app.oneshot(request(Method::GET, "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["registry"], "public-data");
    assert_eq!(json["registry_configured"], false);
    assert_eq!(json["classifier_configured"], true);
}

#[tokio::test]
async fn test_analyze_route_rejects_get() {
    let response = app()
        .oneshot(request(Method::GET, "/pills/analyze"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_analyze_route_requires_multipart() {
    let response = app()
        .oneshot(request(Method::POST, "/pills/analyze"))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = app()
        .oneshot(request(Method::GET, "/v1/models"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error_type"], "not_found");
}
