// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection-only response types

use serde::Serialize;

use crate::vision::{BoundingBox, DetectionOutcome};

/// A located pill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedPill {
    pub index: usize,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Response from POST /pills/detect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectPillsResponse {
    pub request_id: String,
    pub count: usize,
    /// Crop snapshot paths; empty when snapshots are disabled
    pub pill_locations: Vec<String>,
    pub detections: Vec<DetectedPill>,
}

impl From<DetectionOutcome> for DetectPillsResponse {
    fn from(outcome: DetectionOutcome) -> Self {
        let detections = outcome
            .detections
            .iter()
            .map(|d| DetectedPill {
                index: d.index,
                bbox: d.bbox,
                confidence: d.confidence,
            })
            .collect();

        Self {
            count: outcome.count(),
            pill_locations: outcome
                .saved_crops
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            request_id: outcome.request_id,
            detections,
        }
    }
}
