//! File extension normalization.
//!
//! Every extension that crosses a module boundary is in canonical form:
//! lowercase with a leading dot (`".jpg"`). Callers may pass `"JPG"`,
//! `"jpg"` or `".Jpg"` and get the same answer.

use std::path::Path;

/// Normalizes an extension to lowercase, dot-prefixed form.
///
/// An empty string stays empty so "no extension" is never confused with
/// an extension called `"."`.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Returns the normalized extension of a path, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(normalize_extension)
        .unwrap_or_default()
}

/// Returns the extension of a path exactly as written, dot included.
pub(crate) fn raw_extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
