//! Configuration-driven model catalog and recommendation list.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A model provider shown on the pricing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vendor {
    pub id: i64,
    #[schema(example = "Anthropic")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Icon identifier or URL, passed through to the frontend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// How an endpoint type is reached on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EndpointInfo {
    #[schema(example = "/v1/chat/completions")]
    pub path: String,
    #[schema(example = "POST")]
    pub method: String,
}

/// A model offered through the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogModel {
    pub model_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub vendor_id: Option<i64>,
    /// Fixed price per call. When set the model is billed per call and its model ratio is ignored.
    #[serde(default)]
    pub model_price: Option<f64>,
    #[serde(default)]
    pub completion_ratio: Option<f64>,
    /// Groups through which the model can be used
    #[serde(default)]
    pub enable_groups: Vec<String>,
    /// Keys into [`Catalog::endpoints`]
    #[serde(default)]
    pub supported_endpoint_types: Vec<String>,
}

/// Models, vendors and endpoint types served on the pricing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Catalog {
    pub models: Vec<CatalogModel>,
    pub vendors: Vec<Vendor>,
    pub endpoints: BTreeMap<String, EndpointInfo>,
}

impl Catalog {
    /// Check internal references: unique model names and vendor ids, known vendors and endpoint
    /// types, and sane prices.
    pub fn validate(&self) -> Result<(), String> {
        let mut vendor_ids = HashSet::new();
        for vendor in &self.vendors {
            if !vendor_ids.insert(vendor.id) {
                return Err(format!("duplicate vendor id {}", vendor.id));
            }
        }

        let mut names = HashSet::new();
        for model in &self.models {
            let name = &model.model_name;
            if name.is_empty() {
                return Err("catalog model with empty model_name".to_string());
            }
            if !names.insert(name.as_str()) {
                return Err(format!("duplicate catalog model '{name}'"));
            }
            if let Some(vendor_id) = model.vendor_id.filter(|id| !vendor_ids.contains(id)) {
                return Err(format!("model '{name}' references unknown vendor {vendor_id}"));
            }
            if let Some(endpoint) = model
                .supported_endpoint_types
                .iter()
                .find(|endpoint| !self.endpoints.contains_key(*endpoint))
            {
                return Err(format!("model '{name}' references unknown endpoint type '{endpoint}'"));
            }
            for (field, value) in [("model_price", model.model_price), ("completion_ratio", model.completion_ratio)] {
                if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                    return Err(format!("model '{name}': {field} must be a finite, non-negative number"));
                }
            }
        }
        Ok(())
    }
}

fn endpoint(path: &str, method: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
    }
}

fn model(name: &str, description: &str, tags: &[&str], vendor_id: i64, endpoints: &[&str], completion_ratio: f64) -> CatalogModel {
    CatalogModel {
        model_name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        vendor_id: Some(vendor_id),
        model_price: None,
        completion_ratio: Some(completion_ratio),
        enable_groups: vec!["default".to_string(), "vip".to_string()],
        supported_endpoint_types: endpoints.iter().map(|e| e.to_string()).collect(),
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let vendor = |id: i64, name: &str| Vendor {
            id,
            name: name.to_string(),
            description: String::new(),
            icon: None,
        };
        Self {
            vendors: vec![vendor(1, "OpenAI"), vendor(2, "Anthropic"), vendor(3, "Google")],
            endpoints: BTreeMap::from([
                ("openai".to_string(), endpoint("/v1/chat/completions", "POST")),
                ("openai-response".to_string(), endpoint("/v1/responses", "POST")),
                ("anthropic".to_string(), endpoint("/v1/messages", "POST")),
                ("gemini".to_string(), endpoint("/v1beta/models/{model}:generateContent", "POST")),
                ("embeddings".to_string(), endpoint("/v1/embeddings", "POST")),
            ]),
            models: vec![
                model("gpt-4o", "OpenAI flagship multimodal model", &["chat", "vision"], 1, &["openai", "openai-response"], 4.0),
                model("gpt-4o-mini", "Small, fast GPT-4o variant", &["chat"], 1, &["openai", "openai-response"], 4.0),
                model("text-embedding-3-small", "Text embeddings", &["embedding"], 1, &["embeddings"], 1.0),
                model("claude-sonnet-4-20250514", "Balanced Claude model", &["chat", "code"], 2, &["anthropic", "openai"], 5.0),
                model("gemini-2.5-pro", "Google reasoning model", &["chat", "reasoning"], 3, &["gemini", "openai"], 8.0),
                model("gemini-2.5-flash", "Fast Gemini model", &["chat"], 3, &["gemini", "openai"], 8.0),
            ],
        }
    }
}

/// A curated model suggestion for the landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    /// Banner image
    pub url: String,
    pub model: String,
    /// Example prompts
    pub text: Vec<String>,
    #[serde(rename = "modelLogo")]
    pub model_logo: String,
}

pub fn default_recommendations() -> Vec<Recommendation> {
    vec![Recommendation {
        url: "https://publicfile.m-glass.cn/b03639daaacf351aaadc12fd7f530eea.jpg".to_string(),
        model: "gemini-2.5-pro".to_string(),
        text: vec!["Help me write a resume".to_string(), "Help me draft a document".to_string()],
        model_logo: "https://publicfile.m-glass.cn/Xnip2025-09-22_11-30-53.png".to_string(),
    }]
}
