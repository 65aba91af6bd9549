//! Virtual-path normalization shared by all file backends.

/// Normalize a file path: trim, require non-empty, ensure a leading slash.
///
/// Whitespace-only paths are rejected with an `"Error:"` string so the
/// result can be returned to the model verbatim.
pub fn normalize_path(path: &str) -> Result<String, String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err("Error: Path cannot be empty".to_string());
    }
    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{}", trimmed))
    }
}

/// Normalize a listing prefix: empty or absent becomes `/`, a leading and a
/// trailing slash are guaranteed.
pub fn normalize_prefix(prefix: Option<&str>) -> String {
    let raw = prefix.unwrap_or("").trim();
    if raw.is_empty() || raw == "/" {
        return "/".to_string();
    }
    let mut out = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    };
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// The path relative to `prefix`, when `path` lives under it.
/// `prefix` must be normalized (leading and trailing slash).
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == "/" {
        return path.strip_prefix('/');
    }
    path.strip_prefix(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_prepends_slash() {
        assert_eq!(normalize_path("notes.txt").unwrap(), "/notes.txt");
        assert_eq!(normalize_path("/a/b.txt").unwrap(), "/a/b.txt");
    }

    #[test]
    fn test_normalize_path_rejects_whitespace() {
        assert!(normalize_path("   ").is_err());
        assert!(normalize_path("").is_err());
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(None), "/");
        assert_eq!(normalize_prefix(Some("")), "/");
        assert_eq!(normalize_prefix(Some("a/b")), "/a/b/");
        assert_eq!(normalize_prefix(Some("/a/b/")), "/a/b/");
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("/a/b.txt", "/a/"), Some("b.txt"));
        assert_eq!(strip_prefix("/a/b.txt", "/"), Some("a/b.txt"));
        assert_eq!(strip_prefix("/c/b.txt", "/a/"), None);
    }
}
