// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request pipeline: detect → recognize → enrich
//!
//! Detection runs once per upload. Classification of all crops then runs
//! concurrently, followed by concurrent enrichment. Every per-pill result
//! keeps its detection position, so the output order never depends on which
//! network call finished first.

use std::time::Instant;

use bytes::Bytes;
use tracing::info;

use crate::recognition::Recognizer;
use crate::registry::{Enricher, PillDetail};
use crate::vision::{BoundingBox, DetectionError, DetectionOutcome, DetectionService};

/// One fully processed pill
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedPill {
    /// Position in detection order
    pub index: usize,
    pub bbox: BoundingBox,
    pub detection_confidence: f32,
    pub name: String,
    /// Classifier confidence (0.0-1.0)
    pub confidence: f32,
    pub detail: Option<PillDetail>,
}

/// Result of analyzing one upload
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub request_id: String,
    pub pills: Vec<AnalyzedPill>,
    pub detection_time_ms: u64,
    pub recognition_time_ms: u64,
    pub enrichment_time_ms: u64,
}

impl AnalysisReport {
    pub fn count(&self) -> usize {
        self.pills.len()
    }
}

/// Sequences detection, recognition and enrichment for one upload
#[derive(Clone)]
pub struct PillAnalyzer {
    detection: DetectionService,
    recognizer: Recognizer,
    enricher: Enricher,
}

impl PillAnalyzer {
    pub fn new(detection: DetectionService, recognizer: Recognizer, enricher: Enricher) -> Self {
        Self {
            detection,
            recognizer,
            enricher,
        }
    }

    pub fn detection(&self) -> &DetectionService {
        &self.detection
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    /// Detection only (crops and snapshots, no network calls)
    pub async fn detect(&self, image_bytes: Bytes) -> Result<DetectionOutcome, DetectionError> {
        self.detection.detect(image_bytes).await
    }

    /// Run the full pipeline.
    ///
    /// Only image decoding and detection can fail; recognition and
    /// enrichment failures are absorbed per pill.
    pub async fn analyze(&self, image_bytes: Bytes) -> Result<AnalysisReport, DetectionError> {
        let start = Instant::now();
        let outcome = self.detection.detect(image_bytes).await?;
        let detection_time_ms = start.elapsed().as_millis() as u64;

        if outcome.detections.is_empty() {
            info!("ID: {} | no pills detected", outcome.request_id);
            return Ok(AnalysisReport {
                request_id: outcome.request_id,
                pills: Vec::new(),
                detection_time_ms,
                recognition_time_ms: 0,
                enrichment_time_ms: 0,
            });
        }

        let start = Instant::now();
        let recognitions = self.recognizer.recognize_all(outcome.encoded_crops()).await;
        let recognition_time_ms = start.elapsed().as_millis() as u64;

        let start = Instant::now();
        let enriched = self.enricher.enrich_all(&recognitions).await;
        let enrichment_time_ms = start.elapsed().as_millis() as u64;

        let pills: Vec<AnalyzedPill> = outcome
            .detections
            .iter()
            .zip(enriched)
            .map(|(detection, pill)| AnalyzedPill {
                index: detection.index,
                bbox: detection.bbox,
                detection_confidence: detection.confidence,
                name: pill.name,
                confidence: pill.confidence,
                detail: pill.detail,
            })
            .collect();

        info!(
            "ID: {} | analyzed {} pills (detect {}ms, recognize {}ms, enrich {}ms)",
            outcome.request_id,
            pills.len(),
            detection_time_ms,
            recognition_time_ms,
            enrichment_time_ms
        );

        Ok(AnalysisReport {
            request_id: outcome.request_id,
            pills,
            detection_time_ms,
            recognition_time_ms,
            enrichment_time_ms,
        })
    }
}
