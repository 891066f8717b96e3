// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Drug registry enrichment
//!
//! Components:
//! - `client` - public drug registry HTTP client
//! - `enricher` - concurrent, failure-tolerant detail lookups
//! - `types` - registry items, pill details and errors

pub mod client;
pub mod enricher;
pub mod types;

pub use client::{DrugRegistry, PublicDataRegistry, DEFAULT_REGISTRY_TIMEOUT};
pub use enricher::{EnrichedPill, Enricher};
pub use types::{PillDetail, RegistryError, RegistryItem, NOT_AVAILABLE};
