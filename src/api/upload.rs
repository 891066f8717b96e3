// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart image upload extraction

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use tracing::warn;

use super::errors::ApiError;
use crate::vision::detect_format;

/// Form field carrying the image
pub const UPLOAD_FIELD: &str = "file";

/// An uploaded image, not yet decoded
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Reject empty uploads and non-image content types.
    ///
    /// Without a declared content type the bytes must carry a known image
    /// signature.
    pub fn validate(self) -> Result<Self, ApiError> {
        if self.bytes.is_empty() {
            return Err(ApiError::ValidationError {
                field: UPLOAD_FIELD.to_string(),
                message: "uploaded file is empty".to_string(),
            });
        }

        let is_image = match &self.content_type {
            Some(content_type) => content_type.to_ascii_lowercase().starts_with("image/"),
            None => detect_format(&self.bytes).is_ok(),
        };

        if !is_image {
            return Err(ApiError::ValidationError {
                field: UPLOAD_FIELD.to_string(),
                message: "only image files can be uploaded".to_string(),
            });
        }

        Ok(self)
    }
}

/// Read the image from a multipart form.
///
/// Takes the `file` field; when the form has none, the first field that
/// carries a file name is used instead.
pub async fn read_image_upload(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    let mut fallback: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_upload_field = field.name() == Some(UPLOAD_FIELD);
        if !is_upload_field && (fallback.is_some() || field.file_name().is_none()) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        let upload = ImageUpload {
            file_name,
            content_type,
            bytes,
        };

        if is_upload_field {
            return upload.validate();
        }
        fallback = Some(upload);
    }

    fallback
        .ok_or_else(|| ApiError::ValidationError {
            field: UPLOAD_FIELD.to_string(),
            message: "an image file is required".to_string(),
        })
        .and_then(ImageUpload::validate)
}

fn multipart_error(e: MultipartError) -> ApiError {
    warn!("Multipart read error: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("uploaded file exceeds the size limit".to_string())
    } else {
        ApiError::InvalidRequest(format!("Failed to read multipart data: {}", e.body_text()))
    }
}
