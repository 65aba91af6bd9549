//! Pluggable virtual-filesystem backends.
//!
//! Every backend satisfies one contract: line-addressed reads with numbered
//! rendering, create-only writes (overwrite is an explicit opt-in), literal
//! edits, prefix listing, glob and regex search, and the todo list. The
//! agent core talks only to [FileBackend]; which physical storage sits
//! behind it is the caller's choice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schemas::{AgentState, FileData, Todo};

mod state;
pub use state::StateBackend;

mod disk;
pub use disk::DiskBackend;

mod store;
pub use store::StoreBackend;

mod composite;
pub use composite::CompositeBackend;

/// Kind of a listed entry.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Dir,
}

/// Metadata for one listed file or directory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub path: String,
    pub kind: FileKind,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn file(path: impl Into<String>, size: u64, modified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::File,
            size,
            modified_at,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Dir,
            size: 0,
            modified_at: None,
        }
    }
}

/// Result of a write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteResult {
    pub error: Option<String>,
    pub path: Option<String>,
}

impl WriteResult {
    pub fn ok(path: impl Into<String>) -> Self {
        Self {
            error: None,
            path: Some(path.into()),
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            path: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of an edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditResult {
    pub error: Option<String>,
    pub path: Option<String>,
    pub occurrences: Option<u32>,
}

impl EditResult {
    pub fn ok(path: impl Into<String>, occurrences: u32) -> Self {
        Self {
            error: None,
            path: Some(path.into()),
            occurrences: Some(occurrences),
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            path: None,
            occurrences: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// One grep match: path, 1-based line number, line text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrepMatch {
    pub path: String,
    pub line: u32,
    pub text: String,
}

/// The uniform backend contract (spec: read/readRaw/write/edit/ls/glob/grep
/// plus todos and a state snapshot for checkpointing).
///
/// User-input failures (missing file, ambiguous edit, bad regex) are error
/// *strings* suitable for returning to the model verbatim; `Err` is reserved
/// for the same shape so tools can forward either side unchanged.
#[async_trait]
pub trait FileBackend: Send + Sync {
    /// Read lines `offset..offset + limit` (0-based offset, `limit == 0`
    /// reads to the end), rendered with right-aligned line numbers.
    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, String>;

    /// The raw file record, timestamps included.
    async fn read_raw(&self, path: &str) -> Result<FileData, String>;

    /// Create a file. Overwriting an existing path fails unless the backend
    /// was built overwrite-capable; the error directs to read-then-edit.
    async fn write(&self, path: &str, content: &str) -> WriteResult;

    /// Literal substring replacement. Non-unique matches fail unless
    /// `replace_all` is set.
    async fn edit(
        &self,
        path: &str,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> EditResult;

    /// Entries directly under `prefix`.
    async fn ls_info(&self, prefix: &str) -> Result<Vec<FileInfo>, String>;

    /// Files under `prefix` whose prefix-relative path matches the glob.
    async fn glob_info(&self, pattern: &str, prefix: &str) -> Result<Vec<FileInfo>, String>;

    /// Regex search across file contents. Invalid patterns yield an error
    /// string starting with `"Invalid regex pattern:"`.
    async fn grep_raw(
        &self,
        pattern: &str,
        prefix: Option<&str>,
        glob_filter: Option<&str>,
    ) -> Result<Vec<GrepMatch>, String>;

    async fn get_todos(&self) -> Vec<Todo>;

    async fn set_todos(&self, todos: Vec<Todo>);

    /// Snapshot for checkpointing. Backends whose files live in external
    /// durable storage snapshot todos only; the state backend overrides
    /// this with the full file map.
    async fn state_snapshot(&self) -> AgentState {
        AgentState {
            todos: self.get_todos().await,
            files: Default::default(),
        }
    }

    /// Restore from a checkpoint snapshot. The default applies todos only.
    async fn restore_state(&self, state: AgentState) {
        self.set_todos(state.todos).await;
    }
}

pub(crate) fn not_found_error(path: &str) -> String {
    format!("Error: File '{}' not found", path)
}

pub(crate) fn already_exists_error(path: &str) -> String {
    format!(
        "Error: File '{}' already exists. Read it first and use edit to modify it.",
        path
    )
}
