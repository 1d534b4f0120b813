//! Resetting the model ratios to the compiled-in default.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};

use super::sync::{WriteError, persist_then_apply};
use super::tables::parse_ratio_table;
use super::{OptionKey, RatioStore, defaults};
use crate::db::options::OptionStore;
use crate::metrics;

/// Restores `ModelRatio` to the default table, in the option store first and then in memory.
#[derive(Clone)]
pub struct RatioResetOperation {
    store: Arc<RatioStore>,
    options: Arc<dyn OptionStore>,
    write_timeout: Duration,
}

impl RatioResetOperation {
    pub fn new(store: Arc<RatioStore>, options: Arc<dyn OptionStore>, write_timeout: Duration) -> Self {
        Self {
            store,
            options,
            write_timeout,
        }
    }

    /// Persist the canonical default model ratios, then swap them into the mirror.
    ///
    /// On any error the mirror keeps its previous table. If the store confirmed the write, even
    /// late, the mirror matches it afterwards. [`WriteError::Unconfirmed`] is the one case where
    /// the store may hold the default while the mirror does not.
    #[instrument(skip(self), err)]
    pub async fn reset_model_ratio_to_default(&self) -> Result<(), WriteError> {
        let result = self.try_reset().await;
        match &result {
            Ok(entries) => {
                info!(entries, "Model ratios reset to default");
                metrics::record_model_ratio_reset("ok");
            }
            Err(e) => {
                error!("Model ratio reset failed: {e}");
                metrics::record_model_ratio_reset(e.outcome());
            }
        }
        result.map(|_| ())
    }

    async fn try_reset(&self) -> Result<usize, WriteError> {
        let key = OptionKey::ModelRatio;
        let json = defaults::default_model_ratio_json()?;
        // Parsed back from the exact bytes being persisted, so the mirror matches the store
        let table = parse_ratio_table(key, &json)?;
        let entries = table.len();

        persist_then_apply(&self.store, self.options.as_ref(), key, &json, self.write_timeout, || {
            self.store.replace_model_ratios(table)
        })
        .await?;
        Ok(entries)
    }
}
