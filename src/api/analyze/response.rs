// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pill analysis response types

use serde::{Deserialize, Serialize};

use crate::pipeline::{AnalysisReport, AnalyzedPill};
use crate::recognition::UNKNOWN_LABEL;
use crate::registry::PillDetail;

/// Recognition result for one pill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillRecognitionResponse {
    /// Position in detection order (0-based)
    pub pill_index: usize,
    /// Product name, or "unknown"
    pub pill_name: String,
    /// Classifier confidence (0.0-1.0)
    pub confidence: f32,
    /// Registry details; null when the pill was not recognized
    pub details: Option<PillDetail>,
}

impl Default for PillRecognitionResponse {
    fn default() -> Self {
        Self {
            pill_index: 0,
            pill_name: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
            details: None,
        }
    }
}

impl From<AnalyzedPill> for PillRecognitionResponse {
    fn from(pill: AnalyzedPill) -> Self {
        Self {
            pill_index: pill.index,
            pill_name: pill.name,
            confidence: pill.confidence.clamp(0.0, 1.0),
            details: pill.detail,
        }
    }
}

/// Response from POST /pills/analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzePillResponse {
    pub status: String,
    pub total_count: usize,
    pub pill_details: Vec<PillRecognitionResponse>,
}

impl AnalyzePillResponse {
    pub fn new(pill_details: Vec<PillRecognitionResponse>) -> Self {
        Self {
            status: "success".to_string(),
            total_count: pill_details.len(),
            pill_details,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl From<AnalysisReport> for AnalyzePillResponse {
    fn from(report: AnalysisReport) -> Self {
        Self::new(report.pills.into_iter().map(Into::into).collect())
    }
}
