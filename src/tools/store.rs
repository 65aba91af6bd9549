//! Key-value storage capability used by the persistent file backend and the
//! key-value checkpointer.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Minimal key-value contract: get, set, delete, and prefix listing.
/// Prefix listing is what lets a backend enumerate the files it stores.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, String>;

    async fn set(&self, key: &str, value: Value) -> Result<(), String>;

    async fn delete(&self, key: &str) -> Result<(), String>;

    /// All keys starting with `prefix`, sorted.
    async fn list_with_prefix(&self, prefix: &str) -> Result<Vec<String>, String>;
}

/// In-memory store for defaults and tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryKvStore {
    data: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, String> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), String> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn list_with_prefix(&self, prefix: &str) -> Result<Vec<String>, String> {
        Ok(self
            .data
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
