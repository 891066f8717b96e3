// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every setting can come from a command-line flag or an environment
//! variable (a `.env` file is loaded first by the binary).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::recognition::DEFAULT_MAX_CONCURRENCY;
use crate::vision::detection::DEFAULT_CONFIDENCE_THRESHOLD;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL_PATH: &str = "models/best.onnx";
pub const DEFAULT_SAVE_DIR: &str = "data/learning_dataset";
pub const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 5;

/// Pill identification server
#[derive(Parser, Debug, Clone)]
#[command(name = "pill-identifier")]
#[command(about = "Detects, names and describes pills in uploaded photos", long_about = None)]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, env = "API_HOST", default_value = DEFAULT_HOST)]
    pub host: IpAddr,

    /// Port to bind the HTTP server to
    #[arg(long, env = "API_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// YOLO pill detector (ONNX)
    #[arg(long, env = "YOLO_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Root directory for original and crop snapshots
    #[arg(long, env = "CROP_SAVE_DIR", default_value = DEFAULT_SAVE_DIR)]
    pub save_dir: PathBuf,

    /// Write snapshots of every upload and crop
    #[arg(long, env = "SAVE_SNAPSHOTS", default_value_t = true, action = ArgAction::Set)]
    pub save_snapshots: bool,

    /// Minimum detector confidence for a box to be kept
    #[arg(long, env = "DETECTION_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub detection_confidence: f32,

    /// Hosted image classifier endpoint
    #[arg(long, env = "HUGGING_FACE_MODEL_URL")]
    pub classifier_url: String,

    /// Bearer token for the classifier
    #[arg(long, env = "HUGGING_FACE_TOKEN")]
    pub classifier_token: Option<String>,

    #[arg(long, env = "CLASSIFIER_TIMEOUT_SECS", default_value_t = DEFAULT_CLASSIFIER_TIMEOUT_SECS)]
    pub classifier_timeout_secs: u64,

    /// Public drug registry endpoint
    #[arg(long, env = "DATA_API_URL")]
    pub registry_url: String,

    /// Service key for the drug registry
    #[arg(long, env = "PUBLIC_DATA_API_KEY")]
    pub registry_api_key: Option<String>,

    #[arg(long, env = "REGISTRY_TIMEOUT_SECS", default_value_t = DEFAULT_REGISTRY_TIMEOUT_SECS)]
    pub registry_timeout_secs: u64,

    /// Upper bound on concurrent classifier and registry calls per request
    #[arg(long, env = "MAX_CONCURRENT_LOOKUPS", default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(format!(
                "Detection confidence must be between 0 and 1, got {}",
                self.detection_confidence
            ));
        }
        if self.max_concurrency == 0 {
            return Err("Max concurrency must be greater than 0".to_string());
        }
        if self.classifier_timeout_secs == 0 || self.registry_timeout_secs == 0 {
            return Err("Timeouts must be greater than 0".to_string());
        }
        url::Url::parse(&self.classifier_url)
            .map_err(|e| format!("Invalid classifier URL '{}': {}", self.classifier_url, e))?;
        url::Url::parse(&self.registry_url)
            .map_err(|e| format!("Invalid registry URL '{}': {}", self.registry_url, e))?;
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    /// Snapshot directory, or `None` when snapshots are switched off
    pub fn snapshot_dir(&self) -> Option<&PathBuf> {
        self.save_snapshots.then_some(&self.save_dir)
    }
}
