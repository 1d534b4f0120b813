//! Persisted key/value option store.
//!
//! Ratio tables live here as JSON strings under well-known keys (`ModelRatio`, `GroupRatio`, ...).
//! The store is the source of truth; the in-memory mirror in
//! [`RatioStore`](crate::ratios::store::RatioStore) is rebuilt from it on startup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::instrument;

use crate::db::errors::Result;

/// Storage trait for persisted options.
///
/// Implementations must make `put` all-or-nothing: when it returns an error (including a
/// timeout) the previous value must still be in place.
#[async_trait::async_trait]
pub trait OptionStore: Send + Sync {
    /// Read the persisted value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value for `key`.
    ///
    /// `timeout` bounds how long the write may take; implementations that can enforce it
    /// server-side should do so.
    async fn put(&self, key: &str, value: &str, timeout: Duration) -> Result<()>;
}

/// In-memory option store, suitable for development and tests. Values are lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryOptionStore {
    options: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OptionStore for InMemoryOptionStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.options.read().await.get(key).cloned())
    }

    #[instrument(skip(self, value), fields(value_len = value.len()))]
    async fn put(&self, key: &str, value: &str, _timeout: Duration) -> Result<()> {
        self.options.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
