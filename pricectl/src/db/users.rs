//! User directory: resolves a user id to the user's pricing group and role.
//!
//! The gateway's account system owns users; this service only reads them. [`CachedUserDirectory`]
//! fronts any directory with a TTL cache so that identity lookups on the pricing path are cache
//! hits in the common case.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::RwLock;
use tracing::{instrument, trace};

use crate::db::errors::{DbError, Result};
use crate::types::{CurrentUser, UserId};

#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id. `Ok(None)` means the user does not exist.
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<CurrentUser>>;
}

/// In-memory directory, seeded from configuration or tests.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, CurrentUser>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = CurrentUser>) -> Self {
        let users = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<CurrentUser>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

/// TTL cache in front of another directory.
///
/// Only found users are cached; misses and errors always go to the inner directory so a newly
/// created user becomes visible immediately.
pub struct CachedUserDirectory {
    inner: Arc<dyn UserDirectory>,
    cache: Cache<UserId, CurrentUser>,
}

impl CachedUserDirectory {
    pub fn new(inner: Arc<dyn UserDirectory>, capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
        }
    }
}

#[async_trait::async_trait]
impl UserDirectory for CachedUserDirectory {
    #[instrument(skip(self))]
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<CurrentUser>> {
        if let Some(user) = self.cache.get(&id).await {
            trace!("user cache hit");
            return Ok(Some(user));
        }

        let inner = self.inner.clone();
        let loaded = self
            .cache
            .try_get_with(id, async move {
                match inner.get_user_by_id(id).await {
                    Ok(Some(user)) => Ok(user),
                    Ok(None) => Err(Lookup::Missing),
                    Err(e) => Err(Lookup::Failed(e.to_string())),
                }
            })
            .await;

        match loaded {
            Ok(user) => Ok(Some(user)),
            Err(e) => match e.as_ref() {
                Lookup::Missing => Ok(None),
                Lookup::Failed(message) => Err(DbError::Other(anyhow::anyhow!("user lookup failed: {message}"))),
            },
        }
    }
}

/// Loader outcome that must not be cached
#[derive(Debug)]
enum Lookup {
    Missing,
    Failed(String),
}
