// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Attaches registry details to recognized pills

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::client::DrugRegistry;
use super::types::PillDetail;
use crate::recognition::RecognitionResult;

/// A recognized pill with its optional registry detail
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPill {
    pub name: String,
    pub confidence: f32,
    /// `None` when the pill was not recognized
    pub detail: Option<PillDetail>,
}

/// Looks up recognized labels in a [`DrugRegistry`].
///
/// Lookups never fail: registry errors and empty matches both turn into the
/// placeholder detail. Unrecognized pills are not looked up at all.
#[derive(Clone)]
pub struct Enricher {
    registry: Arc<dyn DrugRegistry>,
    max_concurrency: usize,
}

impl Enricher {
    pub fn new(registry: Arc<dyn DrugRegistry>, max_concurrency: usize) -> Self {
        Self {
            registry,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn registry_name(&self) -> &'static str {
        self.registry.name()
    }

    pub fn registry_configured(&self) -> bool {
        self.registry.is_configured()
    }

    /// Fetch details for one item name, falling back to the placeholder
    pub async fn lookup_detail(&self, item_name: &str) -> PillDetail {
        match self.registry.find_item(item_name).await {
            Ok(Some(item)) => PillDetail::from(item),
            Ok(None) => {
                debug!("No registry match for '{}'", item_name);
                PillDetail::default()
            }
            Err(e) => {
                warn!("Registry lookup failed [{}]: {}", item_name, e);
                PillDetail::default()
            }
        }
    }

    pub async fn enrich(&self, recognition: &RecognitionResult) -> EnrichedPill {
        let detail = if recognition.is_known() {
            Some(self.lookup_detail(&recognition.label).await)
        } else {
            None
        };

        EnrichedPill {
            name: recognition.label.clone(),
            confidence: recognition.score,
            detail,
        }
    }

    /// Enrich every recognition concurrently, preserving input order
    pub async fn enrich_all(&self, recognitions: &[RecognitionResult]) -> Vec<EnrichedPill> {
        stream::iter(recognitions.to_vec())
            .map(|recognition| {
                let this = self.clone();
                async move { this.enrich(&recognition).await }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}
