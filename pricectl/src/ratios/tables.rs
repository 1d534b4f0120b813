//! Ratio table types and their persisted JSON representation.
//!
//! All tables are `BTreeMap`s, so serializing them yields keys in ascending order. That ordering
//! is the canonical persisted form: equal tables always encode to byte-identical strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{OptionKey, RatioError, Result};

/// Global cost multiplier per group
pub type GroupRatioTable = BTreeMap<String, f64>;

/// Cost multiplier per model
pub type ModelRatioTable = BTreeMap<String, f64>;

/// Per-requester, visibility-filtered group ratios
pub type EffectiveRatioMapping = BTreeMap<String, f64>;

/// Sparse `(requester group, target group) -> ratio` overrides.
///
/// Persisted as a nested object: `{"vip": {"default": 0.5}}` means requesters in `vip` pay 0.5
/// for the `default` group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideMatrix(BTreeMap<String, BTreeMap<String, f64>>);

impl OverrideMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override for `requester` using `target`, if one exists
    pub fn get(&self, requester: &str, target: &str) -> Option<f64> {
        self.0.get(requester).and_then(|targets| targets.get(target)).copied()
    }

    pub fn insert(&mut self, requester: impl Into<String>, target: impl Into<String>, ratio: f64) {
        self.0.entry(requester.into()).or_default().insert(target.into(), ratio);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|targets| targets.is_empty())
    }

    /// Iterate over `(requester, target, ratio)` triples
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.0
            .iter()
            .flat_map(|(requester, targets)| targets.iter().map(move |(target, ratio)| (requester.as_str(), target.as_str(), *ratio)))
    }
}

impl<R: Into<String>, T: Into<String>> FromIterator<(R, T, f64)> for OverrideMatrix {
    fn from_iter<I: IntoIterator<Item = (R, T, f64)>>(iter: I) -> Self {
        let mut matrix = OverrideMatrix::new();
        for (requester, target, ratio) in iter {
            matrix.insert(requester, target, ratio);
        }
        matrix
    }
}

fn check_ratio(key: OptionKey, name: &str, value: f64) -> Result<()> {
    if name.is_empty() {
        return Err(RatioError::EmptyName { key });
    }
    if !value.is_finite() || value < 0.0 {
        return Err(RatioError::InvalidRatio {
            key,
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

/// Check every entry of a flat ratio table (`GroupRatio` or `ModelRatio`)
pub fn validate_ratio_table(key: OptionKey, table: &BTreeMap<String, f64>) -> Result<()> {
    table.iter().try_for_each(|(name, value)| check_ratio(key, name, *value))
}

pub fn validate_override_matrix(matrix: &OverrideMatrix) -> Result<()> {
    let key = OptionKey::GroupGroupRatio;
    for (requester, target, ratio) in matrix.iter() {
        if requester.is_empty() {
            return Err(RatioError::EmptyName { key });
        }
        check_ratio(key, target, ratio)?;
    }
    Ok(())
}

/// Parse and validate a flat ratio table
pub fn parse_ratio_table(key: OptionKey, json: &str) -> Result<BTreeMap<String, f64>> {
    let table: BTreeMap<String, f64> = serde_json::from_str(json).map_err(|source| RatioError::InvalidJson { key, source })?;
    validate_ratio_table(key, &table)?;
    Ok(table)
}

/// Parse and validate a `GroupGroupRatio` value
pub fn parse_override_matrix(json: &str) -> Result<OverrideMatrix> {
    let matrix: OverrideMatrix = serde_json::from_str(json).map_err(|source| RatioError::InvalidJson {
        key: OptionKey::GroupGroupRatio,
        source,
    })?;
    validate_override_matrix(&matrix)?;
    Ok(matrix)
}

/// Encode a table in its canonical persisted form
pub fn to_canonical_json<T: Serialize>(key: OptionKey, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| RatioError::Encode { key, source })
}
