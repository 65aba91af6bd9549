//! Thread persistence: checkpoint snapshots and their storage adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schemas::{AgentState, Message};

mod memory;
pub use memory::InMemorySaver;

mod file;
pub use file::FileSaver;

mod store;
pub use store::KvSaver;

/// Errors raised by checkpoint storage.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(String),
}

/// A serialized snapshot sufficient to resume a thread: the message buffer,
/// the agent state, and a monotonically non-decreasing step counter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub thread_id: String,
    pub step: u64,
    pub messages: Vec<Message>,
    pub state: AgentState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(
        thread_id: impl Into<String>,
        step: u64,
        messages: Vec<Message>,
        state: AgentState,
    ) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            step,
            messages,
            state,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy with refreshed `updated_at` and `created_at` carried over from
    /// an earlier save, when one exists.
    pub(crate) fn stamped(&self, previous: Option<&Checkpoint>) -> Checkpoint {
        let mut out = self.clone();
        if let Some(prev) = previous {
            out.created_at = prev.created_at;
        }
        out.updated_at = Utc::now();
        out
    }
}

/// Pluggable checkpoint storage. Saves overwrite; `created_at` survives
/// from the first save of a thread and `updated_at` is refreshed on each.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;

    /// The latest checkpoint for a thread; `None` when the thread is
    /// unknown or its record is corrupt.
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, PersistenceError>;

    /// All known thread ids.
    async fn list(&self) -> Result<Vec<String>, PersistenceError>;

    async fn delete(&self, thread_id: &str) -> Result<(), PersistenceError>;

    async fn exists(&self, thread_id: &str) -> Result<bool, PersistenceError> {
        Ok(self.load(thread_id).await?.is_some())
    }
}
