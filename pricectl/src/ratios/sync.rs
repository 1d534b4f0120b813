//! Keeping the in-memory mirror in step with the option store.
//!
//! [`OptionSync::load_persisted`] rebuilds the mirror from the store at startup, and
//! [`OptionSync::update_option`] is the administrative write path.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use super::tables::{
    GroupRatioTable, ModelRatioTable, OverrideMatrix, parse_override_matrix, parse_ratio_table, to_canonical_json,
};
use super::visibility::{ConfiguredVisibilityPolicy, UsableGroups, parse_usable_groups};
use super::{OptionKey, RatioError, RatioStore};
use crate::db::errors::DbError;
use crate::db::options::OptionStore;
use crate::metrics;

/// Failure of a persist-then-apply write. In every case the mirror is left unchanged.
///
/// Only [`WriteError::Unconfirmed`] can leave the store ahead of the mirror; the mirror catches up
/// on the next successful write of that key or on restart.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The new value was rejected before anything was written
    #[error(transparent)]
    Invalid(#[from] RatioError),

    /// The option store rejected the write
    #[error("Failed to persist {key}: {source}")]
    Persist {
        key: OptionKey,
        #[source]
        source: DbError,
    },

    /// The option store did not confirm the write before the deadline, and a read-back showed the
    /// new value was not stored
    #[error("Persisting {key} timed out after {}", humantime::format_duration(*.after))]
    Timeout { key: OptionKey, after: Duration },

    /// The write timed out and the stored value could not be read back, so it may or may not
    /// have been persisted. Live values are unchanged.
    #[error("Persisting {key} timed out and the stored value could not be verified; live values are unchanged until the next reload")]
    Unconfirmed { key: OptionKey },
}

impl WriteError {
    /// Label for metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            WriteError::Invalid(_) => "invalid",
            WriteError::Persist { .. } => "persist_failed",
            WriteError::Timeout { .. } => "timeout",
            WriteError::Unconfirmed { .. } => "unconfirmed",
        }
    }
}

/// A validated option value, ready to be swapped into the mirror
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOption {
    ModelRatio(ModelRatioTable),
    GroupRatio(GroupRatioTable),
    GroupGroupRatio(OverrideMatrix),
    UserUsableGroups(UsableGroups),
}

impl ParsedOption {
    pub fn parse(key: OptionKey, json: &str) -> Result<Self, RatioError> {
        Ok(match key {
            OptionKey::ModelRatio => ParsedOption::ModelRatio(parse_ratio_table(key, json)?),
            OptionKey::GroupRatio => ParsedOption::GroupRatio(parse_ratio_table(key, json)?),
            OptionKey::GroupGroupRatio => ParsedOption::GroupGroupRatio(parse_override_matrix(json)?),
            OptionKey::UserUsableGroups => ParsedOption::UserUsableGroups(parse_usable_groups(json)?),
        })
    }

    pub fn key(&self) -> OptionKey {
        match self {
            ParsedOption::ModelRatio(_) => OptionKey::ModelRatio,
            ParsedOption::GroupRatio(_) => OptionKey::GroupRatio,
            ParsedOption::GroupGroupRatio(_) => OptionKey::GroupGroupRatio,
            ParsedOption::UserUsableGroups(_) => OptionKey::UserUsableGroups,
        }
    }

    /// Canonical persisted form
    pub fn to_json(&self) -> Result<String, RatioError> {
        let key = self.key();
        match self {
            ParsedOption::ModelRatio(table) | ParsedOption::GroupRatio(table) => to_canonical_json(key, table),
            ParsedOption::GroupGroupRatio(matrix) => to_canonical_json(key, matrix),
            ParsedOption::UserUsableGroups(groups) => to_canonical_json(key, groups),
        }
    }

    fn apply(self, store: &RatioStore, visibility: &ConfiguredVisibilityPolicy) {
        match self {
            ParsedOption::ModelRatio(table) => store.replace_model_ratios(table),
            ParsedOption::GroupRatio(table) => store.replace_group_ratios(table),
            ParsedOption::GroupGroupRatio(matrix) => store.replace_overrides(matrix),
            ParsedOption::UserUsableGroups(groups) => visibility.replace(groups),
        }
    }
}

/// Persist `json` under `key`, then run `apply`, holding the store's write lock throughout.
///
/// `apply` only runs once the store holds `json`. Callers must have parsed and validated the
/// value beforehand so that `apply` itself cannot fail.
///
/// A write that misses its deadline may still have committed. In that case the key is read back
/// (still under the write lock): if the store holds `json` the write is applied after all,
/// otherwise it is reported as [`WriteError::Timeout`]. If the read-back fails too the outcome is
/// [`WriteError::Unconfirmed`].
pub(crate) async fn persist_then_apply(
    store: &RatioStore,
    options: &dyn OptionStore,
    key: OptionKey,
    json: &str,
    timeout: Duration,
    apply: impl FnOnce(),
) -> Result<(), WriteError> {
    let _guard = store.lock_writes().await;

    match tokio::time::timeout(timeout, options.put(key.as_str(), json, timeout)).await {
        Err(_) | Ok(Err(DbError::Timeout { .. })) => {
            reconcile_timed_out_write(options, key, json, timeout).await?;
        }
        Ok(Err(source)) => return Err(WriteError::Persist { key, source }),
        Ok(Ok(())) => {}
    }

    apply();
    Ok(())
}

/// Decide whether a timed-out write of `json` landed. `Ok` means the store holds it.
async fn reconcile_timed_out_write(
    options: &dyn OptionStore,
    key: OptionKey,
    json: &str,
    timeout: Duration,
) -> Result<(), WriteError> {
    match tokio::time::timeout(timeout, options.get(key.as_str())).await {
        Ok(Ok(Some(stored))) if stored == json => {
            warn!(%key, "Option write acknowledged late; the stored value matches, applying it");
            Ok(())
        }
        Ok(Ok(_)) => Err(WriteError::Timeout { key, after: timeout }),
        Ok(Err(e)) => {
            warn!(%key, "Could not read back option after a timed-out write: {e}");
            Err(WriteError::Unconfirmed { key })
        }
        Err(_elapsed) => {
            warn!(%key, "Reading back option after a timed-out write also timed out");
            Err(WriteError::Unconfirmed { key })
        }
    }
}

/// Loads and writes the ratio options.
#[derive(Clone)]
pub struct OptionSync {
    store: Arc<RatioStore>,
    visibility: Arc<ConfiguredVisibilityPolicy>,
    options: Arc<dyn OptionStore>,
    write_timeout: Duration,
}

impl OptionSync {
    pub fn new(
        store: Arc<RatioStore>,
        visibility: Arc<ConfiguredVisibilityPolicy>,
        options: Arc<dyn OptionStore>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            store,
            visibility,
            options,
            write_timeout,
        }
    }

    /// Replace seeded values with persisted ones.
    ///
    /// Missing keys keep their seeded value. Persisted values that fail validation are logged and
    /// skipped. Returns the number of options applied.
    #[instrument(skip(self), err)]
    pub async fn load_persisted(&self) -> Result<usize, DbError> {
        let mut applied = 0;
        for key in OptionKey::ALL {
            let Some(json) = self.options.get(key.as_str()).await? else {
                continue;
            };
            match ParsedOption::parse(key, &json) {
                Ok(parsed) => {
                    parsed.apply(&self.store, &self.visibility);
                    applied += 1;
                }
                Err(e) => warn!(%key, "Ignoring persisted option: {e}"),
            }
        }
        info!(applied, "Loaded persisted ratio options");
        Ok(applied)
    }

    /// Validate, persist and apply a new value for `key`.
    ///
    /// The canonical encoding of the parsed value is persisted, not the raw input.
    #[instrument(skip(self, value), err)]
    pub async fn update_option(&self, key: OptionKey, value: &str) -> Result<(), WriteError> {
        let result = self.try_update_option(key, value).await;
        metrics::record_option_update(key, result.as_ref().map(|_| "ok").unwrap_or_else(WriteError::outcome));
        if result.is_ok() {
            info!(%key, "Option updated");
        }
        result
    }

    async fn try_update_option(&self, key: OptionKey, value: &str) -> Result<(), WriteError> {
        let parsed = ParsedOption::parse(key, value)?;
        let json = parsed.to_json()?;
        persist_then_apply(&self.store, self.options.as_ref(), key, &json, self.write_timeout, || {
            parsed.apply(&self.store, &self.visibility)
        })
        .await
    }
}
