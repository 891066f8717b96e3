// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection-only endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::Multipart;
use tracing::{info, warn};

use super::response::DetectPillsResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::upload::read_image_upload;

/// POST /pills/detect - Locate pills without naming them
///
/// Returns the boxes in detection order together with the paths of the
/// crop snapshots written for this request.
pub async fn detect_pills_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectPillsResponse>, ApiError> {
    let upload = read_image_upload(multipart).await?;

    let outcome = state.analyzer.detect(upload.bytes).await.map_err(|e| {
        warn!("Pill detection failed: {}", e);
        ApiError::from(e)
    })?;

    info!("ID: {} | detected {} pills", outcome.request_id, outcome.count());

    Ok(Json(DetectPillsResponse::from(outcome)))
}
