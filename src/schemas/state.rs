//! Agent state: the todo list and the virtual file map.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a todo item. At most one `in_progress` item at a time is a
/// convention the prompt encourages, not an enforced invariant.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl Default for TodoStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// One planning item. Ids are unique within a list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub status: TodoStatus,
}

impl Todo {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            status: TodoStatus::Pending,
        }
    }
}

/// One virtual file: logical lines plus timestamps.
///
/// `from_text` / `to_text` round-trip exactly: content is the result of
/// splitting on `'\n'` and serializing joins with `'\n'`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileData {
    pub content: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl FileData {
    pub fn from_text(text: &str) -> Self {
        let now = Utc::now();
        Self {
            content: text.split('\n').map(String::from).collect(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn to_text(&self) -> String {
        self.content.join("\n")
    }

    /// Replace the content, refreshing `modified_at` and keeping `created_at`.
    pub fn update_text(&mut self, text: &str) {
        self.content = text.split('\n').map(String::from).collect();
        self.modified_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() || (self.content.len() == 1 && self.content[0].is_empty())
    }

    pub fn byte_len(&self) -> u64 {
        self.to_text().len() as u64
    }
}

/// Everything the agent owns between steps: todos plus the file map,
/// keyed by normalized absolute path.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentState {
    #[serde(default)]
    pub todos: Vec<Todo>,
    #[serde(default)]
    pub files: HashMap<String, FileData>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }
}
