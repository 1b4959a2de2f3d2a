//! Hierarchical paths over a flat key space.
//!
//! A path is a `/`-separated string. Object paths name a leaf
//! (`a/b/file`); tree paths end with the separator (`a/b/`) and the empty
//! path is the root tree. [`Path::dirname`] and [`Path::basename`] split at
//! the last separator, so `dirname("a/b/") == "a/b/"` and
//! `basename("a/b/") == ""`.

use std::fmt;

use crate::error::{IndexError, IndexResult};

/// Path separator.
pub const SEPARATOR: char = '/';

/// A validated path inside a branch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    raw: String,
}

impl Path {
    /// Parse and validate a path.
    ///
    /// Rejected: a leading separator, empty interior segments (`a//b`),
    /// `.` or `..` segments, and NUL bytes.
    pub fn parse(raw: impl Into<String>) -> IndexResult<Self> {
        let raw = raw.into();
        if raw.starts_with(SEPARATOR) {
            return Err(IndexError::invalid(format!(
                "path {raw:?} must not start with '{SEPARATOR}'"
            )));
        }
        if raw.contains('\0') {
            return Err(IndexError::invalid(format!("path {raw:?} contains NUL")));
        }
        let body = raw.strip_suffix(SEPARATOR).unwrap_or(&raw);
        if !body.is_empty() {
            for segment in body.split(SEPARATOR) {
                if segment.is_empty() || segment == "." || segment == ".." {
                    return Err(IndexError::invalid(format!(
                        "path {raw:?} has invalid segment {segment:?}"
                    )));
                }
            }
        }
        Ok(Self { raw })
    }

    /// The root tree path.
    pub fn root() -> Self {
        Self { raw: String::new() }
    }

    /// Join a directory path and an entry name.
    pub fn join(dir: &str, name: &str) -> IndexResult<Self> {
        let mut raw = String::with_capacity(dir.len() + name.len() + 1);
        raw.push_str(dir);
        if !raw.is_empty() && !raw.ends_with(SEPARATOR) {
            raw.push(SEPARATOR);
        }
        raw.push_str(name);
        Self::parse(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_root(&self) -> bool {
        self.raw.is_empty()
    }

    /// Tree paths are the root and anything ending in the separator.
    pub fn is_tree(&self) -> bool {
        self.is_root() || self.raw.ends_with(SEPARATOR)
    }

    /// Everything after the last separator.
    pub fn basename(&self) -> &str {
        match self.raw.rfind(SEPARATOR) {
            Some(i) => &self.raw[i + 1..],
            None => &self.raw,
        }
    }

    /// Everything up to and including the last separator.
    pub fn dirname(&self) -> &str {
        match self.raw.rfind(SEPARATOR) {
            Some(i) => &self.raw[..=i],
            None => "",
        }
    }

    /// Non-empty segments from the root down.
    pub fn segments(&self) -> Vec<&str> {
        self.raw
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// The tree form of this path (with a trailing separator, unless root).
    pub fn to_tree(&self) -> Self {
        if self.is_tree() {
            self.clone()
        } else {
            Self {
                raw: format!("{}{SEPARATOR}", self.raw),
            }
        }
    }

    /// Whether `self` lies under the tree path `prefix`.
    pub fn is_under(&self, prefix: &Path) -> bool {
        prefix.is_tree() && self.raw.starts_with(&prefix.raw)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
