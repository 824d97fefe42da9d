//! Archive-name validation and lookup under the data root.

use std::path::{Component, Path, PathBuf};

/// Resolves an archive name from the URL to a directory under `root`.
///
/// Returns `Some(root/name)` only when `name` is a single plain path
/// segment and that path is an existing directory. Everything else is
/// `None`: empty names, `.` and `..`, names containing separators, and
/// absolute paths. The name is taken verbatim from the URL — callers do
/// not percent-decode it first, so an encoded `..` arrives as `%2E%2E`
/// and simply fails the directory check.
pub async fn resolve_archive_dir(root: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    // Exactly one Normal component. Rejects `..` (ParentDir), `.` (CurDir),
    // `a/b` (two components) and `/etc` (RootDir) without touching the
    // filesystem.
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return None,
    }

    let dir = root.join(name);
    match tokio::fs::metadata(&dir).await {
        Ok(meta) if meta.is_dir() => Some(dir),
        _ => None,
    }
}
