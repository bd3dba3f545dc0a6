//! Module path validation and escaping.
//!
//! Module paths become relative file system paths under the output directory,
//! so they are checked element by element before use. Upper-case letters are
//! escaped as `!` followed by the lower-case letter, which keeps paths that
//! differ only in case apart on case-insensitive file systems.

use crate::error::{MirrorError, Result};
use crate::storage::REPORT_SUFFIX;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._~+\-]+$").expect("Invalid regex pattern"));

fn invalid(path: &str, reason: &'static str) -> MirrorError {
    MirrorError::PathEncoding {
        path: path.to_string(),
        reason,
    }
}

/// Checks that `path` is a well-formed module path.
pub fn check_module_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(path, "empty path"));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(invalid(path, "leading or trailing slash"));
    }

    for element in path.split('/') {
        if element.is_empty() {
            return Err(invalid(path, "empty path element"));
        }
        if element == "." || element == ".." {
            return Err(invalid(path, "relative path element"));
        }
        if element.ends_with('.') {
            return Err(invalid(path, "path element ends in a dot"));
        }
        if !ELEMENT_RE.is_match(element) {
            return Err(invalid(path, "invalid character in path element"));
        }
    }

    Ok(())
}

/// Validates and escapes a module path.
///
/// # Examples
/// ```text
/// github.com/BurntSushi/toml -> github.com/!burnt!sushi/toml
/// ```
pub fn escape_module_path(path: &str) -> Result<String> {
    check_module_path(path)?;

    let mut escaped = String::with_capacity(path.len() + 4);
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    Ok(escaped)
}

/// Splits an escaped module path into the directory holding its report file
/// and the report file name.
///
/// The directory is relative to the output directory and is empty for single
/// element paths such as `stdlib`.
pub fn report_location(escaped: &str) -> (PathBuf, String) {
    let path = Path::new(escaped);
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| escaped.to_string());
    (dir, format!("{base}{REPORT_SUFFIX}"))
}
