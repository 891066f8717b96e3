// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Drug registry types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder for any detail the registry does not provide
pub const NOT_AVAILABLE: &str = "정보 없음";

/// Regulatory details for one pill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillDetail {
    /// Efficacy / indications
    pub effect: String,
    /// Dosage and administration
    pub how_to_use: String,
    /// Precautions
    pub caution: String,
    /// Storage instructions
    pub storage: String,
}

impl Default for PillDetail {
    fn default() -> Self {
        Self {
            effect: NOT_AVAILABLE.to_string(),
            how_to_use: NOT_AVAILABLE.to_string(),
            caution: NOT_AVAILABLE.to_string(),
            storage: NOT_AVAILABLE.to_string(),
        }
    }
}

impl PillDetail {
    /// True when no field carries registry data
    pub fn is_placeholder(&self) -> bool {
        *self == Self::default()
    }
}

/// One item of the public drug registry (e약은요 style field names)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryItem {
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub entp_name: Option<String>,
    #[serde(default)]
    pub efcy_qesitm: Option<String>,
    #[serde(default)]
    pub use_method_qesitm: Option<String>,
    #[serde(default)]
    pub atpn_qesitm: Option<String>,
    #[serde(default)]
    pub deposit_method_qesitm: Option<String>,
}

impl From<RegistryItem> for PillDetail {
    fn from(item: RegistryItem) -> Self {
        Self {
            effect: field_or_placeholder(item.efcy_qesitm),
            how_to_use: field_or_placeholder(item.use_method_qesitm),
            caution: field_or_placeholder(item.atpn_qesitm),
            storage: field_or_placeholder(item.deposit_method_qesitm),
        }
    }
}

fn field_or_placeholder(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Errors that can occur during registry lookups
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Registry timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Registry request failed: {0}")]
    Request(String),

    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),
}
