//! In-memory mirror of the ratio options.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{Mutex, MutexGuard};

use super::defaults;
use super::tables::{GroupRatioTable, ModelRatioTable, OverrideMatrix};

/// Owned ratio state shared by all requests.
///
/// Reads return an immutable snapshot (`Arc`) of a whole table and never block. Writers build a
/// complete new table and swap it in, so a reader sees either the old table or the new one,
/// never a mix. Writers that also persist take [`lock_writes`](Self::lock_writes) first.
pub struct RatioStore {
    group_ratios: ArcSwap<GroupRatioTable>,
    group_group_ratios: ArcSwap<OverrideMatrix>,
    model_ratios: ArcSwap<ModelRatioTable>,
    writes: Mutex<()>,
}

impl RatioStore {
    pub fn new(group_ratios: GroupRatioTable, group_group_ratios: OverrideMatrix, model_ratios: ModelRatioTable) -> Self {
        Self {
            group_ratios: ArcSwap::from_pointee(group_ratios),
            group_group_ratios: ArcSwap::from_pointee(group_group_ratios),
            model_ratios: ArcSwap::from_pointee(model_ratios),
            writes: Mutex::new(()),
        }
    }

    /// Store seeded with the compiled-in defaults
    pub fn with_defaults() -> Self {
        Self::new(
            defaults::default_group_ratios(),
            defaults::default_group_group_ratios(),
            defaults::default_model_ratios(),
        )
    }

    pub fn snapshot_group_ratios(&self) -> Arc<GroupRatioTable> {
        self.group_ratios.load_full()
    }

    pub fn snapshot_overrides(&self) -> Arc<OverrideMatrix> {
        self.group_group_ratios.load_full()
    }

    /// Single override lookup against the current matrix.
    ///
    /// Part of the store's read contract alongside the snapshots. Resolving a whole response must
    /// use one [`RatioStore::snapshot_overrides`] instead, so that every group in it sees the
    /// same matrix.
    pub fn lookup_override(&self, requester: &str, target: &str) -> Option<f64> {
        self.group_group_ratios.load().get(requester, target)
    }

    pub fn snapshot_model_ratios(&self) -> Arc<ModelRatioTable> {
        self.model_ratios.load_full()
    }

    pub fn replace_group_ratios(&self, table: GroupRatioTable) {
        self.group_ratios.store(Arc::new(table));
    }

    pub fn replace_overrides(&self, matrix: OverrideMatrix) {
        self.group_group_ratios.store(Arc::new(matrix));
    }

    pub fn replace_model_ratios(&self, table: ModelRatioTable) {
        self.model_ratios.store(Arc::new(table));
    }

    /// Serialize persist-then-apply writers.
    ///
    /// Hold the guard across both the option-store write and the `replace_*` call.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }
}

impl Default for RatioStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[test]
    fn test_snapshot_is_unaffected_by_later_replace() {
        let store = RatioStore::with_defaults();
        let before = store.snapshot_group_ratios();

        store.replace_group_ratios(BTreeMap::from([("only".to_string(), 9.0)]));

        assert!(before.contains_key("default"));
        assert!(!before.contains_key("only"));
        let after = store.snapshot_group_ratios();
        assert_eq!(after.len(), 1);
        assert_eq!(after["only"], 9.0);
    }

    #[test]
    fn test_lookup_override() {
        let store = RatioStore::with_defaults();
        assert_eq!(store.lookup_override("vip", "default"), None);

        store.replace_overrides([("vip", "default", 0.5)].into_iter().collect());
        assert_eq!(store.lookup_override("vip", "default"), Some(0.5));
        assert_eq!(store.snapshot_overrides().get("vip", "default"), Some(0.5));
    }

    #[tokio::test]
    async fn test_writers_are_serialized() {
        let store = Arc::new(RatioStore::with_defaults());
        let guard = store.lock_writes().await;

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.lock_writes().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[test]
    fn test_reads_do_not_wait_for_writers() {
        let store = RatioStore::with_defaults();
        let _guard = store.writes.try_lock().unwrap();

        // Snapshots remain available while a writer holds the lock
        assert!(!store.snapshot_model_ratios().is_empty());
        assert!(!store.snapshot_group_ratios().is_empty());
    }
}
