//! Project-relative path normalization
//!
//! Every path stored in a hashed tree is relative to the tree root, uses `/`
//! as the only separator and never carries a leading `./` or a trailing slash.
//! The root itself is `"."`. Callers may hand in `./`-prefixed paths (and
//! `\`-separated ones on Windows); they are canonicalized before any lookup.
//! On other platforms `\` is an ordinary filename character.

use std::path::{Component, Path, PathBuf};

/// Path of the tree root
pub const ROOT: &str = ".";

/// Normalize a relative path string to the tree convention
///
/// This function:
/// 1. Splits on `/` (and on `\` under Windows)
/// 2. Drops empty and `.` segments (so `./a//b/` becomes `a/b`)
/// 3. Maps the empty result to the root `"."`
pub fn normalize(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    for segment in path.split(is_separator) {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if !result.is_empty() {
            result.push('/');
        }
        result.push_str(segment);
    }

    if result.is_empty() {
        ROOT.to_string()
    } else {
        result
    }
}

#[cfg(windows)]
fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

#[cfg(not(windows))]
fn is_separator(c: char) -> bool {
    c == '/'
}

/// Child path for the single entry `name` under `parent`; `name` is taken verbatim
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT || parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent path (the path with its last segment stripped); the root is its own parent
pub fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(index) => path[..index].to_string(),
        None => ROOT.to_string(),
    }
}

/// Last segment of the path; the root's name is `"."`
pub fn name(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// Every ancestor directory of `path`, starting at the root and excluding `path` itself
pub fn ancestors(path: &str) -> Vec<String> {
    if path == ROOT {
        return Vec::new();
    }
    let mut result = vec![ROOT.to_string()];
    let mut current = String::new();
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments[..segments.len() - 1] {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        result.push(current.clone());
    }
    result
}

/// Absolute filesystem location of a tree path under `root`
pub fn resolve(root: &Path, path: &str) -> PathBuf {
    if path == ROOT {
        root.to_path_buf()
    } else {
        path.split('/').fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }
}

/// Tree path of `file` relative to `root`, or `None` when `file` is outside of `root`
/// or carries segments that are not valid UTF-8.
pub fn relative_to(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(normalize(&segments.join("/")))
}

/// Whether a normalized archive or tree path stays inside its root
pub fn is_contained(path: &str) -> bool {
    !path.starts_with('/') && !path.split('/').any(|segment| segment == "..")
}
