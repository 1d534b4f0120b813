//! Which groups a requester may see.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{OptionKey, RatioError, Result};

/// Visible groups, keyed by group name, valued by display label
pub type UsableGroups = BTreeMap<String, String>;

pub trait GroupVisibilityPolicy: Send + Sync {
    /// Groups visible to a requester in `group`.
    ///
    /// The empty string stands for an anonymous or unresolved caller.
    fn usable_groups_for(&self, group: &str) -> UsableGroups;
}

/// Policy driven by a configurable `{group: label}` map.
///
/// - Anonymous callers get the map plus the anonymous group.
/// - A known caller whose group is not in the map gets the map plus their own group, labelled
///   with `user_group_label`.
///
/// The map can be replaced at runtime through the `UserUsableGroups` option.
pub struct ConfiguredVisibilityPolicy {
    usable_groups: ArcSwap<UsableGroups>,
    anonymous_group: String,
    user_group_label: String,
}

impl ConfiguredVisibilityPolicy {
    pub fn new(usable_groups: UsableGroups, anonymous_group: impl Into<String>, user_group_label: impl Into<String>) -> Self {
        Self {
            usable_groups: ArcSwap::from_pointee(usable_groups),
            anonymous_group: anonymous_group.into(),
            user_group_label: user_group_label.into(),
        }
    }

    pub fn replace(&self, usable_groups: UsableGroups) {
        self.usable_groups.store(Arc::new(usable_groups));
    }
}

impl GroupVisibilityPolicy for ConfiguredVisibilityPolicy {
    fn usable_groups_for(&self, group: &str) -> UsableGroups {
        let mut groups = UsableGroups::clone(&self.usable_groups.load());
        if group.is_empty() {
            groups
                .entry(self.anonymous_group.clone())
                .or_insert_with(|| self.anonymous_group.clone());
        } else {
            groups.entry(group.to_string()).or_insert_with(|| self.user_group_label.clone());
        }
        groups
    }
}

/// Parse and validate a `UserUsableGroups` value
pub fn parse_usable_groups(json: &str) -> Result<UsableGroups> {
    let key = OptionKey::UserUsableGroups;
    let groups: UsableGroups = serde_json::from_str(json).map_err(|source| RatioError::InvalidJson { key, source })?;
    validate_usable_groups(&groups)?;
    Ok(groups)
}

pub fn validate_usable_groups(groups: &UsableGroups) -> Result<()> {
    if groups.keys().any(|name| name.is_empty()) {
        return Err(RatioError::EmptyName {
            key: OptionKey::UserUsableGroups,
        });
    }
    Ok(())
}
