// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pill analysis endpoint module
//!
//! Provides POST /pills/analyze: detect, recognize and enrich every pill in
//! an uploaded photo.

pub mod handler;
pub mod response;

pub use handler::analyze_pills_handler;
pub use response::{AnalyzePillResponse, PillRecognitionResponse};
