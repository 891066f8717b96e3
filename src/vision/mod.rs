// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for pill detection
//!
//! This module provides:
//! - Image decoding, cropping and JPEG encoding
//! - YOLO (ONNX) pill detection on CPU
//! - Best-effort dataset snapshots of uploads and crops

pub mod detection;
pub mod detector;
pub mod image_utils;
pub mod preprocessing;
pub mod snapshots;

pub use detection::{BoundingBox, PillBox, PillDetector, YoloDetectionModel};
pub use detector::{DetectionError, DetectionOutcome, DetectionResult, DetectionService};
pub use image_utils::{decode_image_bytes, detect_format, encode_jpeg, ImageError, ImageInfo};
pub use snapshots::SnapshotRecorder;
