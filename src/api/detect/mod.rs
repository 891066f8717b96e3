// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection-only endpoint module
//!
//! Provides POST /pills/detect for checking the detector and the dataset
//! snapshots without calling the classifier or the registry.

pub mod handler;
pub mod response;

pub use handler::detect_pills_handler;
pub use response::{DetectPillsResponse, DetectedPill};
