//! In-memory checkpointer for development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Checkpoint, Checkpointer, PersistenceError};

/// Process-local checkpointer. An optional namespace isolates several
/// savers sharing one process.
pub struct InMemorySaver {
    entries: Arc<RwLock<HashMap<String, Checkpoint>>>,
    namespace: Option<String>,
}

impl InMemorySaver {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            namespace: None,
        }
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            namespace: Some(namespace.into()),
        }
    }

    fn key(&self, thread_id: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, thread_id),
            None => thread_id.to_string(),
        }
    }

    fn thread_of<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.namespace {
            Some(ns) => key.strip_prefix(ns.as_str())?.strip_prefix(':'),
            None => Some(key),
        }
    }
}

impl Default for InMemorySaver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Checkpointer for InMemorySaver {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let key = self.key(&checkpoint.thread_id);
        let mut entries = self.entries.write().await;
        let stamped = checkpoint.stamped(entries.get(&key));
        entries.insert(key, stamped);
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, PersistenceError> {
        Ok(self.entries.read().await.get(&self.key(thread_id)).cloned())
    }

    async fn list(&self) -> Result<Vec<String>, PersistenceError> {
        let entries = self.entries.read().await;
        let mut ids: Vec<String> = entries
            .keys()
            .filter_map(|k| self.thread_of(k))
            .map(String::from)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, thread_id: &str) -> Result<(), PersistenceError> {
        self.entries.write().await.remove(&self.key(thread_id));
        Ok(())
    }

    async fn exists(&self, thread_id: &str) -> Result<bool, PersistenceError> {
        Ok(self.entries.read().await.contains_key(&self.key(thread_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_support::{exercise_checkpointer, sample_checkpoint};

    #[tokio::test]
    async fn test_in_memory_saver_contract() {
        exercise_checkpointer(&InMemorySaver::new()).await;
    }

    #[tokio::test]
    async fn test_namespaces_isolate_threads() {
        let entries = Arc::new(RwLock::new(HashMap::new()));
        let a = InMemorySaver {
            entries: Arc::clone(&entries),
            namespace: Some("a".to_string()),
        };
        let b = InMemorySaver {
            entries,
            namespace: Some("b".to_string()),
        };
        a.save(&sample_checkpoint("t", 1)).await.unwrap();
        assert!(a.exists("t").await.unwrap());
        assert!(!b.exists("t").await.unwrap());
        assert!(b.list().await.unwrap().is_empty());
    }
}
