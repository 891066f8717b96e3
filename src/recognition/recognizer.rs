// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Concurrent classification of detected pill crops

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use super::classifier::{Classification, ClassifierError, PillClassifier};
use crate::vision::ImageError;

/// Label used when a crop could not be classified
pub const UNKNOWN_LABEL: &str = "unknown";

/// Default number of in-flight classifier calls per request
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Outcome of classifying one crop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub score: f32,
    /// Set when the classifier call failed and the label was substituted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognitionResult {
    pub fn unknown(error: impl ToString) -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            score: 0.0,
            error: Some(error.to_string()),
        }
    }

    /// False for substituted or empty labels
    pub fn is_known(&self) -> bool {
        let label = self.label.trim();
        !label.is_empty() && label != UNKNOWN_LABEL
    }
}

impl From<Classification> for RecognitionResult {
    fn from(c: Classification) -> Self {
        let label = c.label.trim().to_string();
        if label.is_empty() {
            return Self::unknown(ClassifierError::EmptyPrediction);
        }
        let score = if c.score.is_finite() {
            c.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            label,
            score,
            error: None,
        }
    }
}

/// Fans out crops to a [`PillClassifier`] with bounded concurrency.
///
/// Results come back in input order whatever order the calls complete in.
/// A failing call never fails the batch: it yields an `"unknown"` result.
#[derive(Clone)]
pub struct Recognizer {
    classifier: Arc<dyn PillClassifier>,
    max_concurrency: usize,
}

impl Recognizer {
    pub fn new(classifier: Arc<dyn PillClassifier>, max_concurrency: usize) -> Self {
        Self {
            classifier,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn classifier_configured(&self) -> bool {
        self.classifier.is_configured()
    }

    /// Classify JPEG-encoded crops, in input order.
    ///
    /// A crop that failed to encode is reported as `"unknown"` without a call.
    pub async fn recognize_all(
        &self,
        crops: Vec<Result<Bytes, ImageError>>,
    ) -> Vec<RecognitionResult> {
        let results: Vec<RecognitionResult> = stream::iter(crops.into_iter().enumerate())
            .map(|(index, jpeg)| {
                let this = self.clone();
                let jpeg = jpeg.map_err(|e| ClassifierError::Encode(e.to_string()));
                async move { this.recognize_one(index, jpeg).await }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let known = results.iter().filter(|r| r.is_known()).count();
        info!(
            "Recognition complete: {}/{} pills identified via {}",
            known,
            results.len(),
            self.classifier.name()
        );

        results
    }

    async fn recognize_one(
        &self,
        index: usize,
        jpeg: Result<Bytes, ClassifierError>,
    ) -> RecognitionResult {
        let outcome = match jpeg {
            Ok(bytes) => self.classifier.classify(bytes).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(classification) => RecognitionResult::from(classification),
            Err(e) => {
                warn!("Pill {} classification failed, using '{}': {}", index, UNKNOWN_LABEL, e);
                RecognitionResult::unknown(e)
            }
        }
    }
}
