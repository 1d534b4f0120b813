//! Per-requester group ratio resolution.

use std::sync::Arc;

use tracing::{instrument, trace};

use super::store::RatioStore;
use super::tables::EffectiveRatioMapping;
use super::visibility::{GroupVisibilityPolicy, UsableGroups};
use crate::types::Identity;

/// Effective ratios together with the visibility they were filtered by
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub group_ratio: EffectiveRatioMapping,
    pub usable_group: UsableGroups,
}

/// Computes what each group costs for a given requester.
///
/// Resolution is a pure read: it snapshots the group ratio table and the override matrix once,
/// so a concurrent administrative update is seen either entirely or not at all.
#[derive(Clone)]
pub struct RatioResolver {
    store: Arc<RatioStore>,
    visibility: Arc<dyn GroupVisibilityPolicy>,
}

impl RatioResolver {
    pub fn new(store: Arc<RatioStore>, visibility: Arc<dyn GroupVisibilityPolicy>) -> Self {
        Self { store, visibility }
    }

    /// Effective group ratios for `identity`
    pub fn resolve(&self, identity: &Identity) -> EffectiveRatioMapping {
        self.resolve_with_visibility(identity).group_ratio
    }

    /// Effective group ratios plus the usable groups for `identity`.
    ///
    /// - Start from the global table.
    /// - For a known requester, replace the ratio of every group that has a
    ///   `(requester group, group)` override. Overrides for groups missing from the global table
    ///   are ignored.
    /// - Drop every group the requester may not see.
    #[instrument(skip_all, fields(identity = identity.kind()))]
    pub fn resolve_with_visibility(&self, identity: &Identity) -> Resolution {
        let global = self.store.snapshot_group_ratios();
        let mut group_ratio = EffectiveRatioMapping::clone(&global);

        if let Some(requester) = identity.group() {
            let overrides = self.store.snapshot_overrides();
            for (group, ratio) in group_ratio.iter_mut() {
                if let Some(special) = overrides.get(requester, group) {
                    trace!(requester, group = %group, ratio = special, "applying group override");
                    *ratio = special;
                }
            }
        }

        let usable_group = self.visibility.usable_groups_for(identity.group().unwrap_or(""));
        group_ratio.retain(|group, _| usable_group.contains_key(group));

        Resolution { group_ratio, usable_group }
    }
}
