// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pill detection service: decode → detect → crop → snapshot

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use thiserror::Error;
use tracing::{error, info};

use super::detection::{BoundingBox, PillDetector};
use super::image_utils::{crop_to_box, decode_image_bytes, encode_jpeg, ImageError, ImageInfo};
use super::snapshots::SnapshotRecorder;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Invalid image: {0}")]
    Image(#[from] ImageError),

    #[error("Pill detection failed: {0}")]
    Inference(String),
}

/// One detected pill: where it is, how sure the detector was, and its crop
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Position in detection order
    pub index: usize,
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub crop: DynamicImage,
    /// The crop as sent to the classifier
    pub jpeg: Result<Bytes, ImageError>,
}

/// Everything a single detection pass produced
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    /// Timestamp id shared by the snapshot files of this request
    pub request_id: String,
    pub image_info: ImageInfo,
    pub detections: Vec<DetectionResult>,
    /// Crop snapshots that were written (may be shorter than `detections`)
    pub saved_crops: Vec<PathBuf>,
}

impl DetectionOutcome {
    pub fn count(&self) -> usize {
        self.detections.len()
    }

    pub fn encoded_crops(&self) -> Vec<Result<Bytes, ImageError>> {
        self.detections.iter().map(|d| d.jpeg.clone()).collect()
    }
}

/// Wraps a [`PillDetector`] with image decoding, cropping and dataset snapshots
#[derive(Clone)]
pub struct DetectionService {
    detector: Arc<dyn PillDetector>,
    recorder: Option<SnapshotRecorder>,
}

impl DetectionService {
    pub fn new(detector: Arc<dyn PillDetector>, recorder: Option<SnapshotRecorder>) -> Self {
        Self { detector, recorder }
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    pub fn snapshots_enabled(&self) -> bool {
        self.recorder.is_some()
    }

    /// Run detection on the blocking thread pool
    pub async fn detect(&self, image_bytes: Bytes) -> Result<DetectionOutcome, DetectionError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.detection_process(&image_bytes))
            .await
            .map_err(|e| DetectionError::Inference(format!("detection task failed: {}", e)))?
    }

    /// Decode the upload, detect pills, crop them and save snapshots
    pub fn detection_process(&self, image_bytes: &[u8]) -> Result<DetectionOutcome, DetectionError> {
        let (image, image_info) = decode_image_bytes(image_bytes)?;
        let request_id = new_request_id();
        info!(
            "ID: {} | image received ({}x{}, {} bytes)",
            request_id, image_info.width, image_info.height, image_info.size_bytes
        );

        let boxes = self.detector.detect(&image).map_err(|e| {
            error!("ID: {} | pill detection failed: {:#}", request_id, e);
            DetectionError::Inference(format!("{:#}", e))
        })?;

        let detections: Vec<DetectionResult> = boxes
            .into_iter()
            .filter_map(|pill| {
                crop_to_box(&image, &pill.bbox).map(|crop| (pill.bbox, pill.confidence, crop))
            })
            .enumerate()
            .map(|(index, (bbox, confidence, crop))| DetectionResult {
                index,
                bbox,
                confidence,
                jpeg: encode_jpeg(&crop).map(Bytes::from),
                crop,
            })
            .collect();

        info!("ID: {} | {} pills detected", request_id, detections.len());

        let saved_crops = match &self.recorder {
            Some(recorder) => {
                recorder.save_original(&request_id, &image);
                let crops: Vec<DynamicImage> = detections.iter().map(|d| d.crop.clone()).collect();
                recorder.save_crops(&request_id, &crops)
            }
            None => Vec::new(),
        };

        Ok(DetectionOutcome {
            request_id,
            image_info,
            detections,
            saved_crops,
        })
    }
}

static REQUEST_SEQ: AtomicU32 = AtomicU32::new(0);

/// `YYYYmmdd_HHMMSS_micros_seq`, local time. The sequence keeps ids from
/// requests within the same microsecond apart.
fn new_request_id() -> String {
    let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!(
        "{}_{:04}",
        chrono::Local::now().format("%Y%m%d_%H%M%S_%6f"),
        seq
    )
}
