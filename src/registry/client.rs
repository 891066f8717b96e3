// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Public drug registry HTTP client
//!
//! Queries the public drug-information API by item name. The API key is
//! passed as the `serviceKey` query parameter and the JSON answer carries
//! matches under `body.items`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::types::{RegistryError, RegistryItem};

/// Default per-call timeout for registry lookups
pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Trait for drug registry backends
#[async_trait]
pub trait DrugRegistry: Send + Sync {
    /// Look up the best match for `item_name`. `Ok(None)` means no match.
    async fn find_item(&self, item_name: &str) -> Result<Option<RegistryItem>, RegistryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Whether the backend has the credentials it needs to answer
    fn is_configured(&self) -> bool {
        true
    }
}

/// API-key authenticated client for the public drug registry
pub struct PublicDataRegistry {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for PublicDataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicDataRegistry")
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PublicDataRegistry {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn query_params<'a>(&'a self, item_name: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut params = Vec::with_capacity(5);
        if let Some(key) = &self.api_key {
            params.push(("serviceKey", key.as_str()));
        }
        params.push(("itemName", item_name));
        params.push(("type", "json"));
        params.push(("numOfRows", "1"));
        params.push(("pageNo", "1"));
        params
    }
}

#[async_trait]
impl DrugRegistry for PublicDataRegistry {
    async fn find_item(&self, item_name: &str) -> Result<Option<RegistryItem>, RegistryError> {
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .query(&self.query_params(item_name))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RegistryError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    RegistryError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!("Registry error body for '{}': {}", item_name, message);
            return Err(RegistryError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let data: RegistryResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        let item = data.body.and_then(RegistryBody::into_first);
        if item.is_some() {
            info!("Registry match found: {}", item_name);
        }
        Ok(item)
    }

    fn name(&self) -> &'static str {
        "public-data"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    #[serde(default)]
    body: Option<RegistryBody>,
}

#[derive(Debug, Deserialize)]
struct RegistryBody {
    #[serde(default)]
    items: Option<RegistryItems>,
}

/// The registry sends an empty string instead of a list when nothing matches
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegistryItems {
    List(Vec<RegistryItem>),
    Other(serde_json::Value),
}

impl RegistryBody {
    fn into_first(self) -> Option<RegistryItem> {
        match self.items {
            Some(RegistryItems::List(items)) => items.into_iter().next(),
            Some(RegistryItems::Other(_)) | None => None,
        }
    }
}
