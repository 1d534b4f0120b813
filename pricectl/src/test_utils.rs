//! Shared fixtures for unit and handler tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;

use crate::config::Config;
use crate::db::errors::{DbError, Result};
use crate::db::options::{InMemoryOptionStore, OptionStore};
use crate::db::users::{InMemoryUserDirectory, UserDirectory};
use crate::types::{CurrentUser, Role, UserId};
use crate::{AppState, Application, Storage, build_state};

pub const IDENTITY_HEADER: &str = "x-pricectl-user-id";

/// `admin` in group `default`
pub const ADMIN_ID: UserId = 1;
/// `common` in group `vip`
pub const VIP_ID: UserId = 2;
/// `common` in group `default`
pub const COMMON_ID: UserId = 3;

pub fn test_user(id: UserId, group: &str, role: Role) -> CurrentUser {
    CurrentUser {
        id,
        username: format!("user-{id}"),
        group: group.to_string(),
        role,
    }
}

/// Default tables plus a `vip -> default` override of 0.5, with metrics off
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.enable_metrics = false;
    config.ratios.group_group_ratios = [("vip", "default", 0.5)].into_iter().collect();
    config.users = vec![
        test_user(ADMIN_ID, "default", Role::Admin),
        test_user(VIP_ID, "vip", Role::Common),
        test_user(COMMON_ID, "default", Role::Common),
    ];
    config
}

pub fn add_identity_header(user_id: UserId) -> (String, String) {
    (IDENTITY_HEADER.to_string(), user_id.to_string())
}

/// State over in-memory stores holding exactly `users`
pub async fn create_test_state(users: Vec<CurrentUser>) -> AppState {
    let directory: Arc<dyn UserDirectory> = Arc::new(InMemoryUserDirectory::with_users(users));
    build_state(create_test_config(), Arc::new(InMemoryOptionStore::new()), directory)
        .await
        .expect("Failed to build test state")
}

pub async fn create_test_app() -> TestServer {
    Application::new(create_test_config())
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// App over `options`, with the user directory seeded from `config.users`
pub async fn create_test_app_with_options(config: Config, options: Arc<dyn OptionStore>) -> TestServer {
    let mut storage = Storage::in_memory(&config);
    storage.options = options;
    Application::with_storage(config, storage)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// Option store that can be told to fail or stall its writes, or fail its reads.
///
/// A delayed write only lands once its delay has elapsed, so a write abandoned by a deadline
/// never reaches the inner store. A late-acknowledged write lands at once and then stalls before
/// returning, like a database that commits but answers after the caller gave up.
#[derive(Default)]
pub struct FlakyOptionStore {
    inner: InMemoryOptionStore,
    fail: AtomicBool,
    fail_reads: AtomicBool,
    delay: Mutex<Duration>,
    ack_delay: Mutex<Duration>,
}

impl FlakyOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn delay_writes(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn ack_late(&self, delay: Duration) {
        *self.ack_delay.lock().unwrap() = delay;
    }

    /// Value held by the underlying store, bypassing any injected read failure
    pub async fn stored(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.unwrap()
    }
}

#[async_trait]
impl OptionStore for FlakyOptionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::Other(anyhow::anyhow!("option store unavailable")));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str, timeout: Duration) -> Result<()> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DbError::Other(anyhow::anyhow!("option store unavailable")));
        }
        self.inner.put(key, value, timeout).await?;
        let ack_delay = *self.ack_delay.lock().unwrap();
        if !ack_delay.is_zero() {
            tokio::time::sleep(ack_delay).await;
        }
        Ok(())
    }
}
