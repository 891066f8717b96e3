// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use pill_identifier::{
    api::{start_server, AppState},
    config::Config,
    recognition::{HuggingFaceClassifier, Recognizer},
    registry::{Enricher, PublicDataRegistry},
    vision::{DetectionService, SnapshotRecorder, YoloDetectionModel},
    PillAnalyzer,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    config.validate().map_err(|e| anyhow!(e))?;

    info!("Starting pill identification server v{}", env!("CARGO_PKG_VERSION"));

    let detector = YoloDetectionModel::new(&config.model_path)
        .with_context(|| format!("loading detector from {}", config.model_path.display()))?
        .with_confidence_threshold(config.detection_confidence);
    info!(
        "Detector loaded: {} (confidence >= {})",
        config.model_path.display(),
        detector.confidence_threshold()
    );

    let recorder = match config.snapshot_dir() {
        Some(dir) => match SnapshotRecorder::new(dir) {
            Ok(recorder) => {
                info!("Saving snapshots under {}", dir.display());
                Some(recorder)
            }
            Err(e) => {
                warn!("Snapshots disabled, cannot prepare {}: {:#}", dir.display(), e);
                None
            }
        },
        None => None,
    };

    if config.classifier_token.is_none() {
        warn!("HUGGING_FACE_TOKEN not set, classifier calls are unauthenticated");
    }
    if config.registry_api_key.is_none() {
        warn!("PUBLIC_DATA_API_KEY not set, registry lookups will likely be rejected");
    }

    let classifier = HuggingFaceClassifier::new(
        &config.classifier_url,
        config.classifier_token.clone(),
        config.classifier_timeout(),
    )?;
    let registry = PublicDataRegistry::new(
        &config.registry_url,
        config.registry_api_key.clone(),
        config.registry_timeout(),
    )?;

    let analyzer = PillAnalyzer::new(
        DetectionService::new(Arc::new(detector), recorder),
        Recognizer::new(Arc::new(classifier), config.max_concurrency),
        Enricher::new(Arc::new(registry), config.max_concurrency),
    );

    start_server(config.bind_addr(), AppState::new(analyzer)).await
}
