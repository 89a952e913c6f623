//! Record paths and the home-directory layout.
//!
//! Every path that reaches the store is normalized first. Subtree operations
//! (move, delete) match on whole segments: `/a/b` covers `/a/b` and
//! `/a/b/...` but never `/a/bc`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path separator.
pub const SEPARATOR: char = '/';

/// A normalized absolute path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordPath(String);

impl RecordPath {
    /// The filesystem root.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Parse and normalize a raw path.
    ///
    /// Repeated separators collapse, `.` segments are dropped and `..` pops
    /// the previous segment (it never climbs above the root). Trailing
    /// separators are removed.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        if raw.is_empty() {
            return Err(crate::Error::InvalidPath("path is empty".to_string()));
        }
        if !raw.starts_with(SEPARATOR) {
            return Err(crate::Error::InvalidPath(format!(
                "path must be absolute: {raw}"
            )));
        }
        if raw.contains('\0') {
            return Err(crate::Error::InvalidPath(
                "path contains a NUL byte".to_string(),
            ));
        }

        let mut stack: Vec<&str> = Vec::new();
        for segment in raw.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    stack.pop();
                }
                s => stack.push(s),
            }
        }

        if stack.is_empty() {
            return Ok(Self::root());
        }

        let mut normalized = String::with_capacity(raw.len());
        for segment in stack {
            normalized.push(SEPARATOR);
            normalized.push_str(segment);
        }
        Ok(Self(normalized))
    }

    /// Get the path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Iterate over the non-empty segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The parent directory, or `None` for the root.
    pub fn parent(&self) -> Option<RecordPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Append a single segment.
    pub fn join(&self, segment: &str) -> crate::Result<RecordPath> {
        if segment.is_empty() || segment.contains(SEPARATOR) {
            return Err(crate::Error::InvalidPath(format!(
                "invalid path segment: {segment:?}"
            )));
        }
        if self.is_root() {
            Self::parse(&format!("{SEPARATOR}{segment}"))
        } else {
            Self::parse(&format!("{}{SEPARATOR}{segment}", self.0))
        }
    }

    /// Segment-bounded containment: true when `self` equals `prefix` or lies
    /// beneath it.
    pub fn is_within(&self, prefix: &RecordPath) -> bool {
        if prefix.is_root() || self.0 == prefix.0 {
            return true;
        }
        self.0
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }

    /// Replace the `src` prefix of this path with `dst`.
    ///
    /// Returns `None` when the path is not within `src`.
    pub fn rebase(&self, src: &RecordPath, dst: &RecordPath) -> Option<RecordPath> {
        if !self.is_within(src) {
            return None;
        }

        // `rest` is either empty or starts with a separator.
        let rest = if src.is_root() {
            if self.is_root() { "" } else { self.as_str() }
        } else {
            &self.0[src.0.len()..]
        };

        let rebased = if dst.is_root() {
            if rest.is_empty() {
                SEPARATOR.to_string()
            } else {
                rest.to_string()
            }
        } else {
            format!("{}{rest}", dst.0)
        };
        Some(Self(rebased))
    }

    /// Half-open byte range `[lo, hi)` holding every strict descendant of
    /// this path. `'0'` is the byte after `'/'`.
    pub fn subtree_range(&self) -> (String, String) {
        if self.is_root() {
            return (SEPARATOR.to_string(), "0".to_string());
        }
        (format!("{}{SEPARATOR}", self.0), format!("{}0", self.0))
    }
}

impl TryFrom<String> for RecordPath {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<RecordPath> for String {
    fn from(path: RecordPath) -> Self {
        path.0
    }
}

impl AsRef<str> for RecordPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordPath({})", self.0)
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Describes where user home directories sit in the path namespace.
///
/// With `home_depth = 4` the layout is
/// `/<namespace>/<shard>/<user-initial>/<username>/...` and the home of
/// `/local/users/d/demo/photos/1.png` is `/local/users/d/demo`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathLayout {
    home_depth: usize,
}

impl PathLayout {
    /// Home depth of the reference deployment.
    pub const DEFAULT_HOME_DEPTH: usize = 4;

    /// Create a layout whose home directories are `home_depth` segments deep.
    pub fn new(home_depth: usize) -> crate::Result<Self> {
        if home_depth == 0 {
            return Err(crate::Error::Config(
                "layout.home_depth must be at least 1".to_string(),
            ));
        }
        Ok(Self { home_depth })
    }

    /// Number of segments forming a home directory.
    pub fn home_depth(&self) -> usize {
        self.home_depth
    }

    fn check_depth(&self, path: &RecordPath) -> crate::Result<Vec<String>> {
        let segments: Vec<String> = path.segments().map(str::to_string).collect();
        if segments.len() < self.home_depth {
            return Err(crate::Error::InvalidPath(format!(
                "{path} lies above the home directory level ({} segments required, got {})",
                self.home_depth,
                segments.len()
            )));
        }
        Ok(segments)
    }

    /// Reject paths shallower than a home directory.
    pub fn validate(&self, path: &RecordPath) -> crate::Result<()> {
        self.check_depth(path).map(|_| ())
    }

    /// The home directory that owns `path`.
    pub fn home_of(&self, path: &RecordPath) -> crate::Result<RecordPath> {
        let segments = self.check_depth(path)?;
        Ok(RecordPath(format!(
            "{SEPARATOR}{}",
            segments[..self.home_depth].join("/")
        )))
    }

    /// The owner name: the last segment of the home directory.
    pub fn owner_of(&self, path: &RecordPath) -> crate::Result<String> {
        let mut segments = self.check_depth(path)?;
        segments.truncate(self.home_depth);
        segments
            .pop()
            .ok_or_else(|| crate::Error::InvalidPath(format!("{path} has no owner segment")))
    }

    /// Ancestor directories of `path`, from its home directory down to its
    /// parent. The path itself is never included and a home directory has
    /// no ancestors.
    pub fn ancestors(&self, path: &RecordPath) -> crate::Result<Vec<RecordPath>> {
        let segments = self.check_depth(path)?;
        let (home, rest) = segments.split_at(self.home_depth);

        let mut current = format!("{SEPARATOR}{}", home.join("/"));
        let mut ancestors = Vec::with_capacity(rest.len());
        for segment in rest {
            ancestors.push(RecordPath(current.clone()));
            current.push(SEPARATOR);
            current.push_str(segment);
        }
        Ok(ancestors)
    }
}

impl Default for PathLayout {
    fn default() -> Self {
        Self {
            home_depth: Self::DEFAULT_HOME_DEPTH,
        }
    }
}
