// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HuggingFaceClassifier tests against a local stub inference endpoint

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use pill_identifier::recognition::{ClassifierError, HuggingFaceClassifier, PillClassifier};
use serde_json::json;
use std::time::Duration;

use crate::common::spawn_stub;

async fn predict(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer hf_test") {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }
    if headers.get("content-type").and_then(|v| v.to_str().ok()) != Some("image/jpeg") {
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected jpeg").into_response();
    }
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty body").into_response();
    }
    Json(json!([
        {"label": "게보린정", "score": 0.97},
        {"label": "펜잘큐정", "score": 0.02}
    ]))
    .into_response()
}

async fn loading() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "Model is currently loading"})),
    )
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!([{"label": "late", "score": 1.0}]))
}

async fn empty() -> impl IntoResponse {
    Json(json!([]))
}

async fn garbage() -> impl IntoResponse {
    "<html>oops</html>"
}

async fn stub_base() -> String {
    let router = Router::new()
        .route("/models/pills", post(predict))
        .route("/models/loading", post(loading))
        .route("/models/slow", post(slow))
        .route("/models/empty", post(empty))
        .route("/models/garbage", post(garbage));
    format!("http://{}", spawn_stub(router).await)
}

fn classifier(base: &str, path: &str, token: Option<&str>) -> HuggingFaceClassifier {
    HuggingFaceClassifier::new(
        &format!("{}{}", base, path),
        token.map(str::to_string),
        Duration::from_millis(500),
    )
    .unwrap()
}

#[tokio::test]
async fn test_returns_top_prediction() {
    let base = stub_base().await;
    let result = classifier(&base, "/models/pills", Some("hf_test"))
        .classify(Bytes::from_static(b"jpeg bytes"))
        .await
        .unwrap();

    assert_eq!(result.label, "게보린정");
    assert!((result.score - 0.97).abs() < 1e-6);
}

#[tokio::test]
async fn test_missing_token_is_an_api_error() {
    let base = stub_base().await;
    let err = classifier(&base, "/models/pills", None)
        .classify(Bytes::from_static(b"jpeg bytes"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::ApiError { status: 401, .. }));
}

#[tokio::test]
async fn test_non_success_status_is_an_api_error() {
    let base = stub_base().await;
    let err = classifier(&base, "/models/loading", Some("hf_test"))
        .classify(Bytes::from_static(b"jpeg bytes"))
        .await
        .unwrap_err();

    match err {
        ClassifierError::ApiError { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("loading"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let base = stub_base().await;
    let err = classifier(&base, "/models/slow", Some("hf_test"))
        .classify(Bytes::from_static(b"jpeg bytes"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::Timeout { timeout_ms: 500 }));
}

#[tokio::test]
async fn test_empty_prediction_list() {
    let base = stub_base().await;
    let err = classifier(&base, "/models/empty", None)
        .classify(Bytes::from_static(b"jpeg bytes"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::EmptyPrediction));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let base = stub_base().await;
    let err = classifier(&base, "/models/garbage", None)
        .classify(Bytes::from_static(b"jpeg bytes"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_request_error() {
    let err = classifier("http://127.0.0.1:1", "/models/pills", None)
        .classify(Bytes::from_static(b"jpeg bytes"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::Request(_)));
}
