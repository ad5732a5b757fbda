//! Relative path keys shared by the state file and the walker
//!
//! Tracked paths are stored relative to the source root using forward
//! slashes on every platform, and converted to native paths only at I/O
//! boundaries.

use std::path::{Component, Path, PathBuf};

/// Compute the forward-slash key of `path` relative to `root`.
///
/// Returns an empty string for the root itself. Returns `None` when `path`
/// is not inside `root` or when a component is not valid UTF-8, since such
/// a name cannot be written to the state file and resolved back.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                if !key.is_empty() {
                    key.push('/');
                }
                key.push_str(part.to_str()?);
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(key)
}

/// Resolve a forward-slash key against `root` into a native path.
pub fn resolve_key(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}
