// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::analyze::analyze_pills_handler;
use super::detect::detect_pills_handler;
use super::errors::ApiError;
use crate::pipeline::PillAnalyzer;
use crate::vision::image_utils::MAX_IMAGE_SIZE;

/// Room for multipart boundaries and headers on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<PillAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: PillAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub detector: String,
    pub classifier: String,
    pub registry: String,
    pub classifier_configured: bool,
    pub registry_configured: bool,
    pub snapshots_enabled: bool,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/pills/analyze", post(analyze_pills_handler))
        .route("/pills/detect", post(detect_pills_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + MULTIPART_OVERHEAD))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Pill identification API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// 200 `ok` when both remote backends have credentials, 503 `degraded` otherwise.
/// A degraded server still answers requests; unclassified pills come back as `unknown`.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let analyzer = &state.analyzer;
    let classifier_configured = analyzer.recognizer().classifier_configured();
    let registry_configured = analyzer.enricher().registry_configured();
    let healthy = classifier_configured && registry_configured;

    let health = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        detector: analyzer.detection().detector_name().to_string(),
        classifier: analyzer.recognizer().classifier_name().to_string(),
        registry: analyzer.enricher().registry_name().to_string(),
        classifier_configured,
        registry_configured,
        snapshots_enabled: analyzer.detection().snapshots_enabled(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}
