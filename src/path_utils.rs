//! Path utilities for naming chapters, archive entries and partial outputs.
//!
//! Folder names coming from the input tree are not guaranteed to be UTF-8, so
//! everything that turns a path into a display or file name goes through the
//! lossy helpers here.

use std::path::{Component, Path, PathBuf};

/// Suffix of files that are still being written.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Gets the file name from a path with fallback to lossy conversion.
///
/// # Arguments
///
/// * `path` - The path to extract the file name from
///
/// # Returns
///
/// * `String` - The file name, using lossy conversion if necessary
pub fn get_file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Joins the components of `path` relative to `base` with `separator`.
///
/// Returns `None` when `path` is not inside `base` or is `base` itself.
pub fn relative_components(base: &Path, path: &Path, separator: &str) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(separator))
    }
}

/// Name of a file inside a ZIP archive: relative to `base`, always `/`-separated.
pub fn archive_entry_name(base: &Path, path: &Path) -> Option<String> {
    relative_components(base, path, "/")
}

/// Sibling path used while `path` is being written, e.g. `ch1.pdf.part`.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Returns true for leftovers of an interrupted write.
pub fn is_partial_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(PARTIAL_SUFFIX))
        .unwrap_or(false)
}
