//! Line-delimited JSON file backend.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   loss.jsonl         {"step":0,"value":0.9}\n{"step":1,"value":0.5}\n
//!   acc.jsonl          {"step":0,"value":0.1}\n...
//!   eval/loss.jsonl    tag "eval/loss"
//! ```
//!
//! One file per tag, one UTF-8 JSON [`Point`](crate::Point) per line, in write
//! order.

mod reader;
mod reporter;

pub use reader::FsReader;
pub use reporter::FsReporter;

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Extension marking a series file.
pub const SERIES_EXTENSION: &str = "jsonl";

/// Check that `key` names a series file inside the root.
///
/// A key is one or more `/`-separated segments, none of them empty, `.` or
/// `..`, and it must not be absolute. Anything else would map outside the
/// root or to a file [`FsReader`]'s `keys()` never lists.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] for a key that fails the check.
pub fn validate_key(key: &str) -> Result<()> {
    let segments_ok = key
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    let components_ok = Path::new(key)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if segments_ok && components_ok {
        Ok(())
    } else {
        Err(Error::InvalidKey(key.to_string()))
    }
}

/// Path of the series file for `key` under `root`.
///
/// Does not check `key`; callers run [`validate_key`] first.
#[must_use]
pub fn jsonl_path(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{key}.{SERIES_EXTENSION}"))
}

/// Metric key for a series file, or `None` if `path` is not a series file
/// under `root`.
///
/// The key is the path relative to `root` with the extension stripped and
/// `/` as separator, so `jsonl_path(root, key)` maps back to the same file.
pub(crate) fn key_for_path(root: &Path, path: &Path) -> Option<String> {
    if path.extension()? != SERIES_EXTENSION {
        return None;
    }
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonl_path() {
        let root = Path::new("/runs/exp");
        assert_eq!(jsonl_path(root, "loss"), PathBuf::from("/runs/exp/loss.jsonl"));
        assert_eq!(
            jsonl_path(root, "eval/loss"),
            PathBuf::from("/runs/exp/eval/loss.jsonl")
        );
    }

    #[test]
    fn test_key_for_path() {
        let root = Path::new("/runs/exp");
        assert_eq!(
            key_for_path(root, Path::new("/runs/exp/loss.jsonl")),
            Some("loss".to_string())
        );
        assert_eq!(
            key_for_path(root, Path::new("/runs/exp/eval/loss.jsonl")),
            Some("eval/loss".to_string())
        );
        assert_eq!(key_for_path(root, Path::new("/runs/exp/notes.txt")), None);
        assert_eq!(key_for_path(root, Path::new("/elsewhere/loss.jsonl")), None);
    }

    #[test]
    fn test_validate_key_accepts_nested_tags() {
        for key in ["loss", "eval/acc", "a/b/c", "loss.v2", ".hidden"] {
            assert!(validate_key(key).is_ok(), "{key}");
        }
    }

    #[test]
    fn test_validate_key_rejects_escaping_keys() {
        for key in ["", "/", "../escaped", "a/../../b", "/etc/passwd", "./loss", "a//b", "loss/", "."] {
            assert!(
                matches!(validate_key(key), Err(Error::InvalidKey(ref k)) if k == key),
                "{key:?}"
            );
        }
    }

    #[test]
    fn test_path_key_roundtrip() {
        let root = Path::new("/runs/exp");
        for key in ["loss", "eval/acc", "a/b/c"] {
            assert_eq!(key_for_path(root, &jsonl_path(root, key)).as_deref(), Some(key));
        }
    }
}
