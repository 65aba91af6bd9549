//! In-memory backend over [AgentState]; the default for new agents.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;

use crate::schemas::{AgentState, FileData, Todo};
use crate::utils::{
    glob_options, normalize_path, normalize_prefix, render_numbered, replace_occurrences,
    strip_prefix,
};

use super::{
    already_exists_error, not_found_error, EditResult, FileBackend, FileInfo, GrepMatch,
    WriteResult,
};

/// Backend holding the whole filesystem in process memory. The single
/// agent loop serializes writes; the lock exists for the shared handle.
pub struct StateBackend {
    state: Arc<RwLock<AgentState>>,
    allow_overwrite: bool,
}

impl StateBackend {
    pub fn new() -> Self {
        Self::from_state(AgentState::new())
    }

    pub fn from_state(state: AgentState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            allow_overwrite: false,
        }
    }

    /// Allow `write` to replace existing files.
    pub fn with_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = allow;
        self
    }

    /// File paths under a normalized prefix, sorted.
    async fn paths_under(&self, prefix: &str) -> Vec<String> {
        let state = self.state.read().await;
        let mut paths: Vec<String> = state
            .files
            .keys()
            .filter(|p| strip_prefix(p, prefix).is_some())
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

impl Default for StateBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileBackend for StateBackend {
    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, String> {
        let path = normalize_path(path)?;
        let state = self.state.read().await;
        let file = state.files.get(&path).ok_or_else(|| not_found_error(&path))?;
        render_numbered(&file.content, offset, limit)
    }

    async fn read_raw(&self, path: &str) -> Result<FileData, String> {
        let path = normalize_path(path)?;
        let state = self.state.read().await;
        state
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| not_found_error(&path))
    }

    async fn write(&self, path: &str, content: &str) -> WriteResult {
        let path = match normalize_path(path) {
            Ok(p) => p,
            Err(e) => return WriteResult::err(e),
        };
        let mut state = self.state.write().await;
        if let Some(existing) = state.files.get_mut(&path) {
            if !self.allow_overwrite {
                return WriteResult::err(already_exists_error(&path));
            }
            existing.update_text(content);
        } else {
            state.files.insert(path.clone(), FileData::from_text(content));
        }
        WriteResult::ok(path)
    }

    async fn edit(
        &self,
        path: &str,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> EditResult {
        let path = match normalize_path(path) {
            Ok(p) => p,
            Err(e) => return EditResult::err(e),
        };
        let mut state = self.state.write().await;
        let file = match state.files.get_mut(&path) {
            Some(f) => f,
            None => return EditResult::err(not_found_error(&path)),
        };
        match replace_occurrences(&file.to_text(), old_string, new_string, replace_all) {
            Ok((text, occurrences)) => {
                file.update_text(&text);
                EditResult::ok(path, occurrences)
            }
            Err(e) => EditResult::err(e),
        }
    }

    async fn ls_info(&self, prefix: &str) -> Result<Vec<FileInfo>, String> {
        let prefix = normalize_prefix(Some(prefix));
        let state = self.state.read().await;
        let mut files = Vec::new();
        let mut dirs = BTreeSet::new();
        for (path, data) in &state.files {
            let Some(rel) = strip_prefix(path, &prefix) else {
                continue;
            };
            match rel.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(format!("{}{}", prefix, dir));
                }
                None => files.push(FileInfo::file(path.clone(), data.byte_len(), Some(data.modified_at))),
            }
        }
        let mut out: Vec<FileInfo> = dirs.into_iter().map(FileInfo::dir).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        out.extend(files);
        Ok(out)
    }

    async fn glob_info(&self, pattern: &str, prefix: &str) -> Result<Vec<FileInfo>, String> {
        let pat = glob::Pattern::new(pattern)
            .map_err(|e| format!("Error: Invalid glob pattern '{}': {}", pattern, e))?;
        let prefix = normalize_prefix(Some(prefix));
        let state = self.state.read().await;
        let mut out = Vec::new();
        for (path, data) in &state.files {
            let Some(rel) = strip_prefix(path, &prefix) else {
                continue;
            };
            if pat.matches_with(rel, glob_options()) {
                out.push(FileInfo::file(path.clone(), data.byte_len(), Some(data.modified_at)));
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn grep_raw(
        &self,
        pattern: &str,
        prefix: Option<&str>,
        glob_filter: Option<&str>,
    ) -> Result<Vec<GrepMatch>, String> {
        let re = Regex::new(pattern).map_err(|e| format!("Invalid regex pattern: {}", e))?;
        let glob_pat = match glob_filter {
            Some(g) => Some(
                glob::Pattern::new(g)
                    .map_err(|e| format!("Error: Invalid glob pattern '{}': {}", g, e))?,
            ),
            None => None,
        };
        let prefix = normalize_prefix(prefix);
        let mut matches = Vec::new();
        for path in self.paths_under(&prefix).await {
            let rel = path.trim_start_matches('/');
            if let Some(ref pat) = glob_pat {
                if !pat.matches_with(rel, glob_options()) {
                    continue;
                }
            }
            let state = self.state.read().await;
            let Some(file) = state.files.get(&path) else {
                continue;
            };
            for (i, line) in file.content.iter().enumerate() {
                if re.is_match(line) {
                    matches.push(GrepMatch {
                        path: path.clone(),
                        line: (i + 1) as u32,
                        text: line.clone(),
                    });
                }
            }
        }
        Ok(matches)
    }

    async fn get_todos(&self) -> Vec<Todo> {
        self.state.read().await.todos.clone()
    }

    async fn set_todos(&self, todos: Vec<Todo>) {
        self.state.write().await.todos = todos;
    }

    async fn state_snapshot(&self) -> AgentState {
        self.state.read().await.clone()
    }

    async fn restore_state(&self, state: AgentState) {
        *self.state.write().await = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::FileKind;
    use crate::utils::EMPTY_FILE_REMINDER;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let backend = StateBackend::new();
        assert!(backend.write("/notes.txt", "alpha\nbeta").await.is_ok());
        let out = backend.read("/notes.txt", 0, 0).await.unwrap();
        assert_eq!(out, "     1\talpha\n     2\tbeta");
    }

    #[tokio::test]
    async fn test_read_raw_preserves_lines_and_timestamps() {
        let backend = StateBackend::new();
        backend.write("/a.txt", "x\ny").await;
        let raw = backend.read_raw("/a.txt").await.unwrap();
        assert_eq!(raw.content, vec!["x", "y"]);
        assert!(raw.created_at <= raw.modified_at);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let backend = StateBackend::new();
        let err = backend.read("/nope.txt", 0, 0).await.unwrap_err();
        assert_eq!(err, "Error: File '/nope.txt' not found");
    }

    #[tokio::test]
    async fn test_read_empty_file() {
        let backend = StateBackend::new();
        backend.write("/empty.txt", "").await;
        assert_eq!(
            backend.read("/empty.txt", 0, 0).await.unwrap(),
            EMPTY_FILE_REMINDER
        );
    }

    #[tokio::test]
    async fn test_write_existing_requires_edit() {
        let backend = StateBackend::new();
        backend.write("/a.txt", "one").await;
        let res = backend.write("/a.txt", "two").await;
        assert!(res.error.unwrap().contains("already exists"));

        let overwriting = StateBackend::new().with_overwrite(true);
        overwriting.write("/a.txt", "one").await;
        assert!(overwriting.write("/a.txt", "two").await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_ambiguous_and_replace_all() {
        let backend = StateBackend::new();
        backend.write("/a.txt", "x y x").await;
        let res = backend.edit("/a.txt", "x", "z", false).await;
        assert!(res.error.unwrap().contains("appears 2 times"));

        let res = backend.edit("/a.txt", "x", "z", true).await;
        assert_eq!(res.occurrences, Some(2));
        let raw = backend.read_raw("/a.txt").await.unwrap();
        assert_eq!(raw.to_text(), "z y z");
    }

    #[tokio::test]
    async fn test_ls_groups_directories() {
        let backend = StateBackend::new();
        backend.write("/top.txt", "1").await;
        backend.write("/docs/a.md", "2").await;
        backend.write("/docs/b.md", "3").await;
        let entries = backend.ls_info("/").await.unwrap();
        let names: Vec<(&str, FileKind)> = entries
            .iter()
            .map(|e| (e.path.as_str(), e.kind))
            .collect();
        assert_eq!(
            names,
            vec![("/docs", FileKind::Dir), ("/top.txt", FileKind::File)]
        );
    }

    #[tokio::test]
    async fn test_glob_across_directories() {
        let backend = StateBackend::new();
        backend.write("/a.md", "1").await;
        backend.write("/docs/b.md", "2").await;
        backend.write("/docs/c.txt", "3").await;
        let hits = backend.glob_info("**/*.md", "/").await.unwrap();
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["/a.md", "/docs/b.md"]);
    }

    #[tokio::test]
    async fn test_grep_matches_and_invalid_pattern() {
        let backend = StateBackend::new();
        backend.write("/a.txt", "hello world\ngoodbye").await;
        let hits = backend.grep_raw("wor.d", None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 1);

        let err = backend.grep_raw("[invalid", None, None).await.unwrap_err();
        assert!(err.starts_with("Invalid regex pattern:"));

        let none = backend.grep_raw("absent", None, None).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let backend = StateBackend::new();
        backend.write("/a.txt", "data").await;
        backend.set_todos(vec![Todo::new("1", "write spec")]).await;
        let snapshot = backend.state_snapshot().await;

        let restored = StateBackend::new();
        restored.restore_state(snapshot.clone()).await;
        assert_eq!(restored.state_snapshot().await, snapshot);
    }
}
