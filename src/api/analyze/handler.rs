// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pill analysis endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::Multipart;
use tracing::{debug, info, warn};

use super::response::AnalyzePillResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::upload::read_image_upload;

/// POST /pills/analyze - Identify every pill in a photo
///
/// Accepts a multipart form with an image in the `file` field.
///
/// # Response
/// - `status`: always "success"
/// - `total_count`: number of detected pills
/// - `pill_details`: one record per pill, in detection order, with the
///   recognized name, classifier confidence and registry details
///
/// # Errors
/// - 400 Bad Request: missing, empty or non-image upload
/// - 413 Payload Too Large: upload exceeds the size limit
/// - 500 Internal Server Error: image decoding or detection failed
pub async fn analyze_pills_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzePillResponse>, ApiError> {
    let upload = read_image_upload(multipart).await?;
    debug!(
        "Analyze request: {} ({} bytes)",
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        upload.bytes.len()
    );

    let report = state.analyzer.analyze(upload.bytes).await.map_err(|e| {
        warn!("Pill analysis failed: {}", e);
        ApiError::from(e)
    })?;

    info!(
        "ID: {} | returning {} pill records",
        report.request_id,
        report.count()
    );

    Ok(Json(AnalyzePillResponse::from(report)))
}
