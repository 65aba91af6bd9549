//! Key-value persistent backend: one store entry per file.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::schemas::{FileData, Todo};
use crate::tools::KeyValueStore;
use crate::utils::{
    glob_options, normalize_path, normalize_prefix, render_numbered, replace_occurrences,
    strip_prefix,
};

use super::{
    already_exists_error, not_found_error, EditResult, FileBackend, FileInfo, GrepMatch,
    WriteResult,
};

const TODOS_KEY: &str = "__todos__";

/// Backend persisting each file as one [KeyValueStore] entry under an
/// optional namespace. Enumeration relies on the store's prefix listing.
pub struct StoreBackend {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    allow_overwrite: bool,
}

impl StoreBackend {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_namespace(store, "agentfs")
    }

    pub fn with_namespace(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            allow_overwrite: false,
        }
    }

    /// Allow `write` to replace existing files.
    pub fn with_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = allow;
        self
    }

    fn key_for(&self, path: &str) -> String {
        format!("{}:{}", self.namespace, path)
    }

    fn path_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&self.namespace)?.strip_prefix(':')
    }

    async fn load(&self, path: &str) -> Result<Option<FileData>, String> {
        let value = self.store.get(&self.key_for(path)).await?;
        match value {
            Some(v) => {
                let data: FileData = serde_json::from_value(v)
                    .map_err(|e| format!("Error: Corrupt file record for '{}': {}", path, e))?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, path: &str, data: &FileData) -> Result<(), String> {
        let value = serde_json::to_value(data).map_err(|e| format!("Error: {}", e))?;
        self.store.set(&self.key_for(path), value).await
    }

    /// Sorted file paths under a normalized prefix.
    async fn paths_under(&self, prefix: &str) -> Result<Vec<String>, String> {
        let keys = self
            .store
            .list_with_prefix(&format!("{}:", self.namespace))
            .await?;
        let mut paths: Vec<String> = keys
            .iter()
            .filter_map(|k| self.path_from_key(k))
            .filter(|p| *p != TODOS_KEY && strip_prefix(p, prefix).is_some())
            .map(String::from)
            .collect();
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl FileBackend for StoreBackend {
    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, String> {
        let path = normalize_path(path)?;
        let file = self
            .load(&path)
            .await?
            .ok_or_else(|| not_found_error(&path))?;
        render_numbered(&file.content, offset, limit)
    }

    async fn read_raw(&self, path: &str) -> Result<FileData, String> {
        let path = normalize_path(path)?;
        self.load(&path)
            .await?
            .ok_or_else(|| not_found_error(&path))
    }

    async fn write(&self, path: &str, content: &str) -> WriteResult {
        let path = match normalize_path(path) {
            Ok(p) => p,
            Err(e) => return WriteResult::err(e),
        };
        let existing = match self.load(&path).await {
            Ok(v) => v,
            Err(e) => return WriteResult::err(e),
        };
        let data = match existing {
            Some(mut file) => {
                if !self.allow_overwrite {
                    return WriteResult::err(already_exists_error(&path));
                }
                file.update_text(content);
                file
            }
            None => FileData::from_text(content),
        };
        match self.save(&path, &data).await {
            Ok(()) => WriteResult::ok(path),
            Err(e) => WriteResult::err(e),
        }
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
        let mut file = match self.load(&path).await {
            Ok(Some(f)) => f,
            Ok(None) => return EditResult::err(not_found_error(&path)),
            Err(e) => return EditResult::err(e),
        };
        match replace_occurrences(&file.to_text(), old_string, new_string, replace_all) {
            Ok((text, occurrences)) => {
                file.update_text(&text);
                match self.save(&path, &file).await {
                    Ok(()) => EditResult::ok(path, occurrences),
                    Err(e) => EditResult::err(e),
                }
            }
            Err(e) => EditResult::err(e),
        }
    }

    async fn ls_info(&self, prefix: &str) -> Result<Vec<FileInfo>, String> {
        let prefix = normalize_prefix(Some(prefix));
        let mut dirs = std::collections::BTreeSet::new();
        let mut files = Vec::new();
        for path in self.paths_under(&prefix).await? {
            let rel = strip_prefix(&path, &prefix).unwrap_or(&path);
            match rel.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(format!("{}{}", prefix, dir));
                }
                None => {
                    let data = self.load(&path).await?;
                    let (size, modified) = data
                        .map(|d| (d.byte_len(), Some(d.modified_at)))
                        .unwrap_or((0, None));
                    files.push(FileInfo::file(path, size, modified));
                }
            }
        }
        let mut out: Vec<FileInfo> = dirs.into_iter().map(FileInfo::dir).collect();
        out.extend(files);
        Ok(out)
    }

    async fn glob_info(&self, pattern: &str, prefix: &str) -> Result<Vec<FileInfo>, String> {
        let pat = glob::Pattern::new(pattern)
            .map_err(|e| format!("Error: Invalid glob pattern '{}': {}", pattern, e))?;
        let prefix = normalize_prefix(Some(prefix));
        let mut out = Vec::new();
        for path in self.paths_under(&prefix).await? {
            let rel = strip_prefix(&path, &prefix).unwrap_or(&path);
            if !pat.matches_with(rel, glob_options()) {
                continue;
            }
            let data = self.load(&path).await?;
            let (size, modified) = data
                .map(|d| (d.byte_len(), Some(d.modified_at)))
                .unwrap_or((0, None));
            out.push(FileInfo::file(path, size, modified));
        }
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
        for path in self.paths_under(&prefix).await? {
            if let Some(ref pat) = glob_pat {
                if !pat.matches_with(path.trim_start_matches('/'), glob_options()) {
                    continue;
                }
            }
            let Some(file) = self.load(&path).await? else {
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
        let value: Option<Value> = self.store.get(&self.key_for(TODOS_KEY)).await.ok().flatten();
        value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    async fn set_todos(&self, todos: Vec<Todo>) {
        if let Ok(value) = serde_json::to_value(&todos) {
            if let Err(e) = self.store.set(&self.key_for(TODOS_KEY), value).await {
                log::warn!("failed to persist todos: {}", e);
            }
        }
    }
}
