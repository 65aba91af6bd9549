//! Composite backend: prefix-routed mounts over a default backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::schemas::{AgentState, FileData, Todo};
use crate::utils::{normalize_path, normalize_prefix};

use super::{EditResult, FileBackend, FileInfo, GrepMatch, WriteResult};

/// Routes operations by longest matching path prefix. The chosen backend
/// sees the path with the prefix stripped (leading slash preserved); every
/// returned path has the prefix restored, so a mounted backend's internal
/// paths never leak. Todos and state snapshots delegate to the default
/// backend.
pub struct CompositeBackend {
    default: Arc<dyn FileBackend>,
    /// Normalized `(prefix, backend)` routes, longest prefix first.
    routes: Vec<(String, Arc<dyn FileBackend>)>,
}

impl CompositeBackend {
    pub fn new(default: Arc<dyn FileBackend>) -> Self {
        Self {
            default,
            routes: Vec::new(),
        }
    }

    /// Mount a backend under a prefix (normalized to `/…/`). Re-registering
    /// the same prefix replaces the previous mount, so longest-prefix
    /// selection can never tie.
    pub fn with_route(mut self, prefix: impl AsRef<str>, backend: Arc<dyn FileBackend>) -> Self {
        let prefix = normalize_prefix(Some(prefix.as_ref()));
        self.routes.retain(|(p, _)| *p != prefix);
        self.routes.push((prefix, backend));
        self.routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// The backend owning `path` plus the stripped inner path.
    fn route_for<'a>(&'a self, path: &str) -> (&'a Arc<dyn FileBackend>, String, &'a str) {
        for (prefix, backend) in &self.routes {
            if let Some(rest) = path.strip_prefix(prefix.trim_end_matches('/')) {
                if rest.is_empty() {
                    return (backend, "/".to_string(), prefix);
                }
                if rest.starts_with('/') {
                    return (backend, rest.to_string(), prefix);
                }
            }
        }
        (&self.default, path.to_string(), "")
    }

    fn restore(prefix: &str, inner: &str) -> String {
        if prefix.is_empty() {
            return inner.to_string();
        }
        format!("{}{}", prefix.trim_end_matches('/'), inner)
    }
}

#[async_trait]
impl FileBackend for CompositeBackend {
    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, String> {
        let path = normalize_path(path)?;
        let (backend, inner, _) = self.route_for(&path);
        backend.read(&inner, offset, limit).await
    }

    async fn read_raw(&self, path: &str) -> Result<FileData, String> {
        let path = normalize_path(path)?;
        let (backend, inner, _) = self.route_for(&path);
        backend.read_raw(&inner).await
    }

    async fn write(&self, path: &str, content: &str) -> WriteResult {
        let path = match normalize_path(path) {
            Ok(p) => p,
            Err(e) => return WriteResult::err(e),
        };
        let (backend, inner, prefix) = self.route_for(&path);
        let mut result = backend.write(&inner, content).await;
        result.path = result.path.map(|p| Self::restore(prefix, &p));
        result
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
        let (backend, inner, prefix) = self.route_for(&path);
        let mut result = backend.edit(&inner, old_string, new_string, replace_all).await;
        result.path = result.path.map(|p| Self::restore(prefix, &p));
        result
    }

    async fn ls_info(&self, prefix: &str) -> Result<Vec<FileInfo>, String> {
        let prefix = normalize_prefix(Some(prefix));
        if prefix == "/" {
            // Root: default contents plus one synthetic entry per mount.
            let mut out = self.default.ls_info("/").await?;
            for (route_prefix, _) in &self.routes {
                out.push(FileInfo::dir(route_prefix.trim_end_matches('/')));
            }
            out.sort_by(|a, b| a.path.cmp(&b.path));
            return Ok(out);
        }
        let (backend, inner, route_prefix) = self.route_for(&prefix);
        let entries = backend.ls_info(&inner).await?;
        Ok(entries
            .into_iter()
            .map(|mut e| {
                e.path = Self::restore(route_prefix, &e.path);
                e
            })
            .collect())
    }

    async fn glob_info(&self, pattern: &str, prefix: &str) -> Result<Vec<FileInfo>, String> {
        let prefix = normalize_prefix(Some(prefix));
        if prefix == "/" {
            let mut out = self.default.glob_info(pattern, "/").await?;
            for (route_prefix, backend) in &self.routes {
                let inner = backend.glob_info(pattern, "/").await?;
                out.extend(inner.into_iter().map(|mut e| {
                    e.path = Self::restore(route_prefix, &e.path);
                    e
                }));
            }
            out.sort_by(|a, b| a.path.cmp(&b.path));
            return Ok(out);
        }
        let (backend, inner, route_prefix) = self.route_for(&prefix);
        let entries = backend.glob_info(pattern, &inner).await?;
        Ok(entries
            .into_iter()
            .map(|mut e| {
                e.path = Self::restore(route_prefix, &e.path);
                e
            })
            .collect())
    }

    async fn grep_raw(
        &self,
        pattern: &str,
        prefix: Option<&str>,
        glob_filter: Option<&str>,
    ) -> Result<Vec<GrepMatch>, String> {
        let prefix = normalize_prefix(prefix);
        if prefix == "/" {
            let mut out = self.default.grep_raw(pattern, None, glob_filter).await?;
            for (route_prefix, backend) in &self.routes {
                let inner = backend.grep_raw(pattern, None, glob_filter).await?;
                out.extend(inner.into_iter().map(|mut m| {
                    m.path = Self::restore(route_prefix, &m.path);
                    m
                }));
            }
            return Ok(out);
        }
        let (backend, inner, route_prefix) = self.route_for(&prefix);
        let matches = backend.grep_raw(pattern, Some(&inner), glob_filter).await?;
        Ok(matches
            .into_iter()
            .map(|mut m| {
                m.path = Self::restore(route_prefix, &m.path);
                m
            })
            .collect())
    }

    async fn get_todos(&self) -> Vec<Todo> {
        self.default.get_todos().await
    }

    async fn set_todos(&self, todos: Vec<Todo>) {
        self.default.set_todos(todos).await
    }

    async fn state_snapshot(&self) -> AgentState {
        self.default.state_snapshot().await
    }

    async fn restore_state(&self, state: AgentState) {
        self.default.restore_state(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FileKind, StateBackend};

    fn composite() -> (CompositeBackend, Arc<StateBackend>, Arc<StateBackend>, Arc<StateBackend>) {
        let default = Arc::new(StateBackend::new());
        let a = Arc::new(StateBackend::new());
        let ab = Arc::new(StateBackend::new());
        let composite = CompositeBackend::new(default.clone() as Arc<dyn FileBackend>)
            .with_route("/a/", a.clone() as Arc<dyn FileBackend>)
            .with_route("/a/b/", ab.clone() as Arc<dyn FileBackend>);
        (composite, default, a, ab)
    }

    #[tokio::test]
    async fn test_longest_prefix_routing() {
        let (composite, _default, a, ab) = composite();

        let res = composite.write("/a/b/file.txt", "deep").await;
        assert_eq!(res.path.as_deref(), Some("/a/b/file.txt"));
        assert!(ab.read_raw("/file.txt").await.is_ok());
        assert!(a.read_raw("/file.txt").await.is_err());

        let res = composite.write("/a/other.txt", "shallow").await;
        assert_eq!(res.path.as_deref(), Some("/a/other.txt"));
        assert!(a.read_raw("/other.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_default_backend_serves_unrouted_paths() {
        let (composite, default, _, _) = composite();
        composite.write("/top.txt", "root data").await;
        assert!(default.read_raw("/top.txt").await.is_ok());
        let out = composite.read("/top.txt", 0, 0).await.unwrap();
        assert!(out.contains("root data"));
    }

    #[tokio::test]
    async fn test_root_ls_synthesizes_mount_entries() {
        let (composite, _, _, _) = composite();
        composite.write("/top.txt", "1").await;
        let entries = composite.ls_info("/").await.unwrap();
        let dirs: Vec<&str> = entries
            .iter()
            .filter(|e| e.kind == FileKind::Dir)
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(dirs, vec!["/a", "/a/b"]);
        assert!(entries.iter().any(|e| e.path == "/top.txt"));
    }

    #[tokio::test]
    async fn test_root_glob_and_grep_union_with_prefixes() {
        let (composite, _, _, _) = composite();
        composite.write("/top.md", "needle here").await;
        composite.write("/a/inner.md", "needle there").await;
        composite.write("/a/b/deep.md", "nothing").await;

        let hits = composite.glob_info("**/*.md", "/").await.unwrap();
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["/a/b/deep.md", "/a/inner.md", "/top.md"]);

        let matches = composite.grep_raw("needle", None, None).await.unwrap();
        let mut paths: Vec<&str> = matches.iter().map(|m| m.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["/a/inner.md", "/top.md"]);
    }

    #[tokio::test]
    async fn test_scoped_ls_restores_prefix() {
        let (composite, _, a, _) = composite();
        composite.write("/a/notes.txt", "x").await;
        let entries = composite.ls_info("/a/").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/a/notes.txt");
        // The mounted backend never sees the `/a/` prefix.
        assert_eq!(a.ls_info("/").await.unwrap()[0].path, "/notes.txt");
    }

    #[tokio::test]
    async fn test_duplicate_route_replaces() {
        let first = Arc::new(StateBackend::new());
        let second = Arc::new(StateBackend::new());
        let composite = CompositeBackend::new(Arc::new(StateBackend::new()) as Arc<dyn FileBackend>)
            .with_route("/m/", first.clone() as Arc<dyn FileBackend>)
            .with_route("/m/", second.clone() as Arc<dyn FileBackend>);
        composite.write("/m/x.txt", "data").await;
        assert!(second.read_raw("/x.txt").await.is_ok());
        assert!(first.read_raw("/x.txt").await.is_err());
    }
}
