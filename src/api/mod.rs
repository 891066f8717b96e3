// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyze;
pub mod detect;
pub mod errors;
pub mod http_server;
pub mod upload;

pub use analyze::{analyze_pills_handler, AnalyzePillResponse, PillRecognitionResponse};
pub use detect::{detect_pills_handler, DetectPillsResponse, DetectedPill};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_router, start_server, AppState, HealthResponse};
pub use upload::{read_image_upload, ImageUpload, UPLOAD_FIELD};
