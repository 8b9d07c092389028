//! Path helpers shared by the storage providers and the file catalog
//!
//! Two kinds of paths flow through the service:
//! - storage paths: provider-relative keys such as `docs/report_1700000000000.pdf`
//! - virtual paths: catalog directories such as `/`, `/docs`, `/docs/2024`

use crate::core::error::{AppError, Result};

/// Normalize a storage path.
///
/// Backslashes become `/`, leading and repeated separators are dropped,
/// `.` segments and trailing separators disappear. `..` segments are kept
/// so callers can reject them with [`has_parent_segment`].
pub fn sanitize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether any segment of `path` is `..`
pub fn has_parent_segment(path: &str) -> bool {
    path.replace('\\', "/").split('/').any(|segment| segment == "..")
}

/// Normalize a catalog directory into its absolute form (`/`, `/a`, `/a/b`).
pub fn normalize_virtual_path(path: &str) -> Result<String> {
    if has_parent_segment(path) {
        return Err(AppError::Validation(format!(
            "Path '{}' must not contain '..' segments",
            path
        )));
    }

    Ok(format!("/{}", sanitize_path(path)))
}

/// Full virtual path of an entry named `name` inside `parent`
pub fn join_virtual(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    format!("{}/{}", parent, name)
}

/// Storage key of an entry named `name` inside the storage directory `dir`
pub fn join_storage(dir: &str, name: &str) -> String {
    let dir = sanitize_path(dir);
    if dir.is_empty() {
        sanitize_path(name)
    } else {
        format!("{}/{}", dir, sanitize_path(name))
    }
}

/// Whether `path` is `ancestor` or lies somewhere below it
pub fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor || path.starts_with(&format!("{}/", ancestor.trim_end_matches('/')))
}

/// Escape `%`, `_` and `\` so `value` matches literally inside a SQL LIKE pattern
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_and_collapses() {
        assert_eq!(sanitize_path("/docs//2024/"), "docs/2024");
        assert_eq!(sanitize_path("///a.txt"), "a.txt");
        assert_eq!(sanitize_path("a\\b\\c"), "a/b/c");
        assert_eq!(sanitize_path("./a/./b"), "a/b");
        assert_eq!(sanitize_path("/"), "");
        assert_eq!(sanitize_path(""), "");
    }

    #[test]
    fn test_sanitize_keeps_parent_segments() {
        assert_eq!(sanitize_path("/a/../b"), "a/../b");
        assert!(has_parent_segment("/a/../b"));
        assert!(has_parent_segment("..\\etc"));
        assert!(!has_parent_segment("/a/..b/c"));
    }

    #[test]
    fn test_normalize_virtual_path() {
        assert_eq!(normalize_virtual_path("").unwrap(), "/");
        assert_eq!(normalize_virtual_path("/").unwrap(), "/");
        assert_eq!(normalize_virtual_path("docs//2024/").unwrap(), "/docs/2024");
        assert!(matches!(
            normalize_virtual_path("/docs/../../etc"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_join_helpers() {
        assert_eq!(join_virtual("/", "docs"), "/docs");
        assert_eq!(join_virtual("/docs", "2024"), "/docs/2024");
        assert_eq!(join_storage("/", "a.png"), "a.png");
        assert_eq!(join_storage("/docs/", "a.png"), "docs/a.png");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("/docs", "/docs"));
        assert!(is_within("/docs/2024", "/docs"));
        assert!(!is_within("/docsx", "/docs"));
        assert!(!is_within("/", "/docs"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("/a_b%c\\d"), "/a\\_b\\%c\\\\d");
    }
}
