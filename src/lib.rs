// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod pipeline;
pub mod recognition;
pub mod registry;
pub mod vision;

pub use config::Config;
pub use pipeline::{AnalysisReport, AnalyzedPill, PillAnalyzer};
