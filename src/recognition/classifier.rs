// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote pill classifier
//!
//! The classifier is a hosted image-classification endpoint (Hugging Face
//! inference API style): raw JPEG bytes in, a JSON list of `{label, score}`
//! predictions out, best first.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default per-call timeout for the classifier
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(10);

/// A single prediction from the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    #[serde(default)]
    pub score: f32,
}

/// Errors that can occur while classifying a pill crop
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Non-success HTTP status from the endpoint
    #[error("Classifier API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Classifier timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Classifier request failed: {0}")]
    Request(String),

    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error("Classifier returned no predictions")]
    EmptyPrediction,

    #[error("Failed to encode crop: {0}")]
    Encode(String),
}

/// Trait for pill classification backends
#[async_trait]
pub trait PillClassifier: Send + Sync {
    /// Classify one JPEG-encoded pill crop, returning the top prediction
    async fn classify(&self, image_jpeg: Bytes) -> Result<Classification, ClassifierError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Whether the backend has the credentials it needs to answer
    fn is_configured(&self) -> bool {
        true
    }
}

/// Hosted models answer either `[{..}, ..]` or `[[{..}, ..]]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionList {
    Flat(Vec<Classification>),
    Nested(Vec<Vec<Classification>>),
}

impl PredictionList {
    fn into_top(self) -> Option<Classification> {
        match self {
            PredictionList::Flat(list) => list.into_iter().next(),
            PredictionList::Nested(lists) => lists.into_iter().next()?.into_iter().next(),
        }
    }
}

/// Bearer-token authenticated HTTP classifier
pub struct HuggingFaceClassifier {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HuggingFaceClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceClassifier")
            .field("endpoint", &self.endpoint)
            .field("has_token", &self.token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HuggingFaceClassifier {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.filter(|t| !t.is_empty()),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PillClassifier for HuggingFaceClassifier {
    async fn classify(&self, image_jpeg: Bytes) -> Result<Classification, ClassifierError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(header::CONTENT_TYPE, "image/jpeg")
            .body(image_jpeg);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                ClassifierError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let predictions: PredictionList = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        let top = predictions.into_top().ok_or(ClassifierError::EmptyPrediction)?;
        debug!("Classifier top prediction: {} ({:.3})", top.label, top.score);
        Ok(top)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}
