// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO pill detection model
//!
//! Runs a YOLOv8-style detector exported to ONNX and turns its raw output
//! into confidence-filtered, NMS-suppressed bounding boxes in original image
//! coordinates.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use ndarray::{ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_detection, PreprocessInfo, DETECTION_INPUT_SIZE};

/// Default confidence threshold for pill detections
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.45;

/// IoU above which a lower-scored box of the same class is suppressed
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// Upper bound on boxes kept per image
pub const MAX_DETECTIONS: usize = 300;

/// Axis-aligned box in pixel coordinates (x1,y1 top-left; x2,y2 bottom-right)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }
}

/// A single detected pill
#[derive(Debug, Clone, PartialEq)]
pub struct PillBox {
    pub bbox: BoundingBox,
    /// Detection confidence score (0.0-1.0)
    pub confidence: f32,
    pub class_id: usize,
}

/// Seam between the request pipeline and the detection backend.
///
/// Implementations return boxes in original image coordinates, ordered by
/// descending confidence.
pub trait PillDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<PillBox>>;

    /// Backend name for logging and health reporting
    fn name(&self) -> &str {
        "pill-detector"
    }
}

/// ONNX-backed YOLO pill detector
///
/// Runs on the CPU execution provider. The session is behind a mutex since
/// `Session::run` takes `&mut self`; weights are never mutated.
#[derive(Clone)]
pub struct YoloDetectionModel {
    session: Arc<Mutex<Session>>,
    input_name: String,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetectionModel")
            .field("input_name", &self.input_name)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloDetectionModel {
    /// Load the detection model from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file does not exist or ONNX Runtime cannot load it.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Pill detection model not found: {}", model_path.display());
        }

        info!("Loading pill detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load pill detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detection model input: {}", input_name);
        info!("✅ Pill detection model loaded (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        })
    }

    /// Set the confidence threshold for detections
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}

impl PillDetector for YoloDetectionModel {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<PillBox>> {
        let info = PreprocessInfo::new(image, DETECTION_INPUT_SIZE);
        let input = preprocess_for_detection(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Detection session lock poisoned"))?;

        let input_value =
            Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        let candidates = parse_yolo_output(output_tensor.view(), self.confidence_threshold)?;
        let kept = non_max_suppression(candidates, self.iou_threshold, MAX_DETECTIONS);

        Ok(kept
            .into_iter()
            .map(|pill| map_to_image(pill, &info))
            .filter(|pill| pill.bbox.area() > 0.0)
            .collect())
    }

    fn name(&self) -> &str {
        "yolo-onnx"
    }
}

/// Parse raw YOLO output into candidate boxes (model input coordinates).
///
/// Accepts `[1, 4+C, N]` (YOLOv8 export) and the transposed `[1, N, 4+C]`.
/// The smaller of the two trailing dimensions is taken as the attribute axis.
pub fn parse_yolo_output(output: ArrayViewD<f32>, confidence_threshold: f32) -> Result<Vec<PillBox>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected detection output shape: {:?}", shape);
    }

    let batch = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .context("Failed to view detection output as 2D")?;
    // rows: one per anchor, columns: [cx, cy, w, h, class scores...]
    let rows = if shape[1] <= shape[2] {
        batch.reversed_axes()
    } else {
        batch
    };

    if rows.shape()[1] < 5 {
        anyhow::bail!("Detection output has no class scores: {:?}", shape);
    }

    let mut candidates = Vec::new();
    for row in rows.outer_iter() {
        let (class_id, score) = row
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, s)| if s > best.1 { (i, s) } else { best });

        if score < confidence_threshold {
            continue;
        }

        candidates.push(PillBox {
            bbox: BoundingBox::from_center(row[0], row[1], row[2], row[3]),
            confidence: score,
            class_id,
        });
    }

    Ok(candidates)
}

/// Greedy per-class non-maximum suppression.
///
/// Output is ordered by descending confidence and capped at `max_detections`.
pub fn non_max_suppression(
    mut candidates: Vec<PillBox>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<PillBox> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<PillBox> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

fn map_to_image(pill: PillBox, info: &PreprocessInfo) -> PillBox {
    let (x1, y1) = info.map_to_original(pill.bbox.x1, pill.bbox.y1);
    let (x2, y2) = info.map_to_original(pill.bbox.x2, pill.bbox.y2);
    let bbox = BoundingBox { x1, y1, x2, y2 }.clamp_to(info.original_width, info.original_height);
    PillBox { bbox, ..pill }
}
