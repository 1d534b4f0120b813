//! Assembling the pricing page from the catalog and the ratio mirror.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::catalog::{Catalog, CatalogModel, EndpointInfo, Vendor};
use crate::ratios::tables::{EffectiveRatioMapping, ModelRatioTable};
use crate::ratios::{RatioResolver, RatioStore, UsableGroups};
use crate::types::Identity;

/// Billed by model ratio
pub const QUOTA_TYPE_RATIO: u8 = 0;
/// Billed by a fixed price per call
pub const QUOTA_TYPE_PRICE: u8 = 1;

const DEFAULT_COMPLETION_RATIO: f64 = 1.0;

/// One model on the pricing page.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PricingEntry {
    #[schema(example = "gpt-4o")]
    pub model_name: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<i64>,
    /// 0 for ratio based billing, 1 for a fixed price per call
    pub quota_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_price: Option<f64>,
    pub completion_ratio: f64,
    pub enable_groups: Vec<String>,
    pub supported_endpoint_types: Vec<String>,
}

impl PricingEntry {
    fn from_catalog(model: &CatalogModel, model_ratios: &ModelRatioTable) -> Self {
        let (quota_type, model_ratio) = match model.model_price {
            Some(_) => (QUOTA_TYPE_PRICE, None),
            None => (QUOTA_TYPE_RATIO, model_ratios.get(&model.model_name).copied()),
        };
        Self {
            model_name: model.model_name.clone(),
            description: model.description.clone(),
            tags: model.tags.clone(),
            vendor_id: model.vendor_id,
            quota_type,
            model_ratio,
            model_price: model.model_price,
            completion_ratio: model.completion_ratio.unwrap_or(DEFAULT_COMPLETION_RATIO),
            enable_groups: model.enable_groups.clone(),
            supported_endpoint_types: model.supported_endpoint_types.clone(),
        }
    }
}

/// Everything the pricing page shows to one requester.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PricingPage {
    pub data: Vec<PricingEntry>,
    pub vendors: Vec<Vendor>,
    /// Effective, visibility-filtered ratio per group
    #[schema(value_type = BTreeMap<String, f64>)]
    pub group_ratio: EffectiveRatioMapping,
    /// Groups the requester may use, with display labels
    #[schema(value_type = BTreeMap<String, String>)]
    pub usable_group: UsableGroups,
    pub supported_endpoint: BTreeMap<String, EndpointInfo>,
    pub auto_groups: Vec<String>,
}

/// Combines the resolver output with catalog data.
#[derive(Clone)]
pub struct PricingView {
    catalog: Arc<Catalog>,
    store: Arc<RatioStore>,
    resolver: RatioResolver,
    auto_groups: Arc<[String]>,
}

impl PricingView {
    pub fn new(catalog: Arc<Catalog>, store: Arc<RatioStore>, resolver: RatioResolver, auto_groups: Vec<String>) -> Self {
        Self {
            catalog,
            store,
            resolver,
            auto_groups: auto_groups.into(),
        }
    }

    #[tracing::instrument(skip_all, fields(identity = identity.kind()))]
    pub fn assemble(&self, identity: &Identity) -> PricingPage {
        let resolution = self.resolver.resolve_with_visibility(identity);
        let model_ratios = self.store.snapshot_model_ratios();

        PricingPage {
            data: self
                .catalog
                .models
                .iter()
                .map(|model| PricingEntry::from_catalog(model, &model_ratios))
                .collect(),
            vendors: self.catalog.vendors.clone(),
            group_ratio: resolution.group_ratio,
            usable_group: resolution.usable_group,
            supported_endpoint: self.catalog.endpoints.clone(),
            auto_groups: self.auto_groups.to_vec(),
        }
    }
}
