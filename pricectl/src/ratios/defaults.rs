//! Compiled-in default tables.
//!
//! A model ratio of 1.0 corresponds to $0.002 per 1K prompt tokens.

use std::collections::BTreeMap;

use super::tables::{GroupRatioTable, ModelRatioTable, OverrideMatrix, to_canonical_json};
use super::{OptionKey, Result};

const DEFAULT_MODEL_RATIOS: &[(&str, f64)] = &[
    ("gpt-3.5-turbo", 0.25),
    ("gpt-3.5-turbo-0125", 0.25),
    ("gpt-4", 15.0),
    ("gpt-4-turbo", 5.0),
    ("gpt-4o", 1.25),
    ("gpt-4o-mini", 0.075),
    ("gpt-4.1", 1.0),
    ("gpt-4.1-mini", 0.2),
    ("o1", 7.5),
    ("o3-mini", 0.55),
    ("text-embedding-3-small", 0.01),
    ("text-embedding-3-large", 0.065),
    ("claude-3-5-haiku-20241022", 0.4),
    ("claude-3-5-sonnet-20241022", 1.5),
    ("claude-3-7-sonnet-20250219", 1.5),
    ("claude-sonnet-4-20250514", 1.5),
    ("claude-opus-4-20250514", 7.5),
    ("gemini-1.5-flash", 0.0375),
    ("gemini-2.0-flash", 0.05),
    ("gemini-2.5-flash", 0.15),
    ("gemini-2.5-pro", 0.625),
    ("deepseek-chat", 0.135),
    ("deepseek-reasoner", 0.275),
];

const DEFAULT_GROUP_RATIOS: &[(&str, f64)] = &[("default", 1.0), ("vip", 1.0), ("svip", 1.0)];

const DEFAULT_USABLE_GROUPS: &[(&str, &str)] = &[("default", "Default group"), ("vip", "VIP group")];

pub fn default_model_ratios() -> ModelRatioTable {
    DEFAULT_MODEL_RATIOS.iter().map(|(name, ratio)| (name.to_string(), *ratio)).collect()
}

pub fn default_group_ratios() -> GroupRatioTable {
    DEFAULT_GROUP_RATIOS.iter().map(|(name, ratio)| (name.to_string(), *ratio)).collect()
}

pub fn default_group_group_ratios() -> OverrideMatrix {
    OverrideMatrix::new()
}

pub fn default_usable_groups() -> BTreeMap<String, String> {
    DEFAULT_USABLE_GROUPS
        .iter()
        .map(|(name, label)| (name.to_string(), label.to_string()))
        .collect()
}

pub fn default_auto_groups() -> Vec<String> {
    vec!["default".to_string()]
}

/// Canonical persisted form of the default model ratios
pub fn default_model_ratio_json() -> Result<String> {
    to_canonical_json(OptionKey::ModelRatio, &default_model_ratios())
}
