//! Disk-mirrored backend: virtual paths translated under a real root
//! directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tokio::sync::RwLock;

use crate::schemas::{FileData, Todo};
use crate::utils::{
    glob_options, normalize_path, normalize_prefix, render_numbered, replace_occurrences,
};

use super::{
    already_exists_error, not_found_error, EditResult, FileBackend, FileInfo, FileKind,
    GrepMatch, WriteResult,
};

/// Backend over a real directory. Virtual `/a/b` maps to `<root>/a/b`;
/// traversal outside the root is rejected. Todos live beside the root in
/// memory (the disk holds files, not planning state).
pub struct DiskBackend {
    root: PathBuf,
    todos: Arc<RwLock<Vec<Todo>>>,
    allow_overwrite: bool,
}

impl DiskBackend {
    /// Create a backend rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            todos: Arc::new(RwLock::new(Vec::new())),
            allow_overwrite: false,
        })
    }

    /// Allow `write` to replace existing files.
    pub fn with_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = allow;
        self
    }

    /// Map a virtual path to a real one inside the root.
    fn resolve(&self, virtual_path: &str) -> Result<PathBuf, String> {
        let normalized = normalize_path(virtual_path)?;
        let rel = normalized.trim_start_matches('/');
        if rel.split('/').any(|seg| seg == "..") {
            return Err(format!(
                "Error: Path '{}' must not contain '..'",
                virtual_path
            ));
        }
        Ok(self.root.join(rel))
    }

    fn virtual_path(&self, real: &Path) -> String {
        let rel = real.strip_prefix(&self.root).unwrap_or(real);
        format!("/{}", rel.to_string_lossy().replace('\\', "/"))
    }

    /// All file paths (virtual) under a real directory, recursively.
    fn walk_files(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), String> {
        let entries = std::fs::read_dir(dir).map_err(|e| format!("Error: {}", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| format!("Error: {}", e))?;
            let path = entry.path();
            if path.is_dir() {
                self.walk_files(&path, out)?;
            } else {
                out.push(path);
            }
        }
        Ok(())
    }

    fn read_lines(&self, real: &Path, virtual_path: &str) -> Result<Vec<String>, String> {
        if !real.is_file() {
            return Err(not_found_error(virtual_path));
        }
        let content =
            std::fs::read_to_string(real).map_err(|e| format!("Error: {}", e))?;
        Ok(content.split('\n').map(String::from).collect())
    }
}

fn system_time_utc(t: std::io::Result<std::time::SystemTime>) -> Option<DateTime<Utc>> {
    t.ok().map(DateTime::<Utc>::from)
}

#[async_trait]
impl FileBackend for DiskBackend {
    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, String> {
        let normalized = normalize_path(path)?;
        let real = self.resolve(&normalized)?;
        let lines = self.read_lines(&real, &normalized)?;
        render_numbered(&lines, offset, limit)
    }

    async fn read_raw(&self, path: &str) -> Result<FileData, String> {
        let normalized = normalize_path(path)?;
        let real = self.resolve(&normalized)?;
        let lines = self.read_lines(&real, &normalized)?;
        let meta = std::fs::metadata(&real).map_err(|e| format!("Error: {}", e))?;
        let modified = system_time_utc(meta.modified()).unwrap_or_else(Utc::now);
        let created = system_time_utc(meta.created()).unwrap_or(modified);
        Ok(FileData {
            content: lines,
            created_at: created,
            modified_at: modified,
        })
    }

    async fn write(&self, path: &str, content: &str) -> WriteResult {
        let normalized = match normalize_path(path) {
            Ok(p) => p,
            Err(e) => return WriteResult::err(e),
        };
        let real = match self.resolve(&normalized) {
            Ok(p) => p,
            Err(e) => return WriteResult::err(e),
        };
        if real.exists() && !self.allow_overwrite {
            return WriteResult::err(already_exists_error(&normalized));
        }
        if let Some(parent) = real.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return WriteResult::err(format!("Error: {}", e));
            }
        }
        match std::fs::write(&real, content) {
            Ok(()) => WriteResult::ok(normalized),
            Err(e) => WriteResult::err(format!("Error: {}", e)),
        }
    }

    async fn edit(
        &self,
        path: &str,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> EditResult {
        let normalized = match normalize_path(path) {
            Ok(p) => p,
            Err(e) => return EditResult::err(e),
        };
        let real = match self.resolve(&normalized) {
            Ok(p) => p,
            Err(e) => return EditResult::err(e),
        };
        if !real.is_file() {
            return EditResult::err(not_found_error(&normalized));
        }
        let content = match std::fs::read_to_string(&real) {
            Ok(c) => c,
            Err(e) => return EditResult::err(format!("Error: {}", e)),
        };
        match replace_occurrences(&content, old_string, new_string, replace_all) {
            Ok((text, occurrences)) => match std::fs::write(&real, text) {
                Ok(()) => EditResult::ok(normalized, occurrences),
                Err(e) => EditResult::err(format!("Error: {}", e)),
            },
            Err(e) => EditResult::err(e),
        }
    }

    async fn ls_info(&self, prefix: &str) -> Result<Vec<FileInfo>, String> {
        let prefix = normalize_prefix(Some(prefix));
        let dir = self.resolve(&prefix)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        let entries = std::fs::read_dir(&dir).map_err(|e| format!("Error: {}", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| format!("Error: {}", e))?;
            let meta = entry.metadata().map_err(|e| format!("Error: {}", e))?;
            let path = self.virtual_path(&entry.path());
            if meta.is_dir() {
                out.push(FileInfo::dir(path));
            } else {
                out.push(FileInfo::file(
                    path,
                    meta.len(),
                    system_time_utc(meta.modified()),
                ));
            }
        }
        out.sort_by(|a, b| (a.kind == FileKind::File).cmp(&(b.kind == FileKind::File)).then(a.path.cmp(&b.path)));
        Ok(out)
    }

    async fn glob_info(&self, pattern: &str, prefix: &str) -> Result<Vec<FileInfo>, String> {
        let pat = glob::Pattern::new(pattern)
            .map_err(|e| format!("Error: Invalid glob pattern '{}': {}", pattern, e))?;
        let prefix = normalize_prefix(Some(prefix));
        let dir = self.resolve(&prefix)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        self.walk_files(&dir, &mut files)?;
        let mut out = Vec::new();
        for real in files {
            let rel = real
                .strip_prefix(&dir)
                .unwrap_or(&real)
                .to_string_lossy()
                .replace('\\', "/");
            if !pat.matches_with(&rel, glob_options()) {
                continue;
            }
            let meta = std::fs::metadata(&real).ok();
            out.push(FileInfo::file(
                self.virtual_path(&real),
                meta.as_ref().map(|m| m.len()).unwrap_or(0),
                meta.and_then(|m| system_time_utc(m.modified())),
            ));
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
        let dir = self.resolve(&prefix)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        self.walk_files(&dir, &mut files)?;
        files.sort();
        let mut matches = Vec::new();
        for real in files {
            let rel = real
                .strip_prefix(&dir)
                .unwrap_or(&real)
                .to_string_lossy()
                .replace('\\', "/");
            if let Some(ref pat) = glob_pat {
                if !pat.matches_with(&rel, glob_options()) {
                    continue;
                }
            }
            // Binary files are skipped rather than surfaced as errors.
            let Ok(content) = std::fs::read_to_string(&real) else {
                continue;
            };
            for (i, line) in content.split('\n').enumerate() {
                if re.is_match(line) {
                    matches.push(GrepMatch {
                        path: self.virtual_path(&real),
                        line: (i + 1) as u32,
                        text: line.to_string(),
                    });
                }
            }
        }
        Ok(matches)
    }

    async fn get_todos(&self) -> Vec<Todo> {
        self.todos.read().await.clone()
    }

    async fn set_todos(&self, todos: Vec<Todo>) {
        *self.todos.write().await = todos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deepagents-disk-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn test_disk_write_read_round_trip() {
        let root = temp_root("rw");
        let backend = DiskBackend::new(&root).unwrap();
        assert!(backend.write("/docs/a.txt", "line one\nline two").await.is_ok());
        let out = backend.read("/docs/a.txt", 0, 0).await.unwrap();
        assert_eq!(out, "     1\tline one\n     2\tline two");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_disk_rejects_traversal() {
        let root = temp_root("traversal");
        let backend = DiskBackend::new(&root).unwrap();
        let res = backend.write("/../escape.txt", "x").await;
        assert!(res.error.unwrap().contains(".."));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_disk_write_existing_then_edit() {
        let root = temp_root("edit");
        let backend = DiskBackend::new(&root).unwrap();
        backend.write("/a.txt", "hello hello").await;
        assert!(backend.write("/a.txt", "again").await.error.is_some());

        let res = backend.edit("/a.txt", "hello", "bye", true).await;
        assert_eq!(res.occurrences, Some(2));
        assert_eq!(
            backend.read_raw("/a.txt").await.unwrap().to_text(),
            "bye bye"
        );
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_disk_glob_and_grep() {
        let root = temp_root("search");
        let backend = DiskBackend::new(&root).unwrap();
        backend.write("/src/main.rs", "fn main() {}").await;
        backend.write("/src/lib.rs", "pub fn lib() {}").await;
        backend.write("/readme.md", "docs").await;

        let hits = backend.glob_info("**/*.rs", "/").await.unwrap();
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["/src/lib.rs", "/src/main.rs"]);

        let matches = backend
            .grep_raw(r"fn \w+", Some("/src/"), Some("**/*.rs"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_disk_ls_lists_dirs_first() {
        let root = temp_root("ls");
        let backend = DiskBackend::new(&root).unwrap();
        backend.write("/z.txt", "1").await;
        backend.write("/sub/a.txt", "2").await;
        let entries = backend.ls_info("/").await.unwrap();
        assert_eq!(entries[0].path, "/sub");
        assert_eq!(entries[0].kind, FileKind::Dir);
        assert_eq!(entries[1].path, "/z.txt");
        let _ = std::fs::remove_dir_all(&root);
    }
}
