//! Slash-separated paths relative to the content root.

use crate::TreeError;

/// Suffix carried by every document file on disk.
pub const DOCUMENT_SUFFIX: &str = ".md";

/// Lexically normalize a relative path.
///
/// Empty and `.` segments are dropped and `..` pops the previous segment.
/// A leading `/` is treated as the content root. Paths that climb above
/// the root or resolve to the root itself are rejected.
pub fn clean_relative(path: &str) -> Result<String, TreeError> {
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(TreeError::InvalidPath(path.to_string()));
                }
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return Err(TreeError::InvalidPath(path.to_string()));
    }

    Ok(parts.join("/"))
}

/// Join a relative directory and an entry name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Parent of a relative path, `""` for top-level entries.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Last segment of a relative path.
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether the path names a document file.
pub fn has_document_suffix(path: &str) -> bool {
    base_name(path)
        .strip_suffix(DOCUMENT_SUFFIX)
        .is_some_and(|stem| !stem.is_empty())
}
