use std::{collections::HashMap, future::Future, hash::Hash};

use shared::domain::PropertyId;
use tokio::sync::RwLock;
use tracing::debug;

/// Keys for cached property queries, used to name invalidations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Properties,
    Property(PropertyId),
}

pub struct QueryCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for QueryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: K, value: V) {
        self.entries.write().await.insert(key, value);
    }

    /// Returns the cached value, or runs `fetch` and caches what it returns.
    /// Failed fetches are not cached.
    pub async fn ensure_query_data<F, Fut, E>(&self, key: &K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key).await {
            debug!(?key, "query cache: hit");
            return Ok(hit);
        }

        let value = fetch().await?;
        self.set(key.clone(), value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &K) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        debug!(?key, removed, "query cache: invalidated");
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
