//! # Field Paths
//!
//! [`FieldPath`] is a dotted, root-relative address of a node in a schema
//! tree (`texts.prov.bbox`). The root itself is the empty path.
//!
//! Paths are compared across sides only after alias and suppression
//! resolution; on their own they identify a node within one side's tree.
//!
//! Pattern matching helpers implement the two wildcard forms used by
//! suppression rules and the coercion allowlist:
//!
//! - `a.b`: exact path / literal prefix / literal suffix.
//! - `**.a.b`: the segments `a.b` appearing anywhere, at any depth.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Leading marker of a multi-segment wildcard pattern.
pub const WILDCARD_PREFIX: &str = "**.";

/// A dotted, root-relative schema path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(String);

impl FieldPath {
    /// The empty (root) path.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Build a path from an already-dotted string.
    pub fn parse(dotted: impl Into<String>) -> Self {
        Self(dotted.into())
    }

    /// Append one segment.
    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}.{segment}", self.0))
        }
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The dotted string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the segments. The root has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The final segment, if any.
    pub fn last_segment(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            self.0.rsplit('.').next()
        }
    }

    /// Whether the path equals `pattern`.
    ///
    /// A `**.x.y` pattern matches any path ending in the segments `x.y`.
    pub fn matches_exact(&self, pattern: &str) -> bool {
        match pattern.strip_prefix(WILDCARD_PREFIX) {
            Some(tail) => self.ends_with_segments(tail),
            None => self.0 == pattern,
        }
    }

    /// Whether `pattern` covers this path as a subtree root: the path equals
    /// the pattern or descends from it.
    ///
    /// A `**.x.y` pattern covers any path in which the segments `x.y` occur
    /// contiguously, at any depth.
    pub fn matches_prefix(&self, pattern: &str) -> bool {
        match pattern.strip_prefix(WILDCARD_PREFIX) {
            Some(tail) => {
                let needle: Vec<&str> = split_segments(tail);
                let hay: Vec<&str> = self.segments().collect();
                !needle.is_empty() && hay.windows(needle.len()).any(|w| w == needle.as_slice())
            }
            None => self.0 == pattern || self.0.starts_with(&format!("{pattern}.")),
        }
    }

    /// Whether the trailing segments of the path equal `pattern`
    /// (with or without a leading `**.`).
    pub fn matches_suffix(&self, pattern: &str) -> bool {
        let tail = pattern.strip_prefix(WILDCARD_PREFIX).unwrap_or(pattern);
        self.ends_with_segments(tail)
    }

    fn ends_with_segments(&self, tail: &str) -> bool {
        let needle = split_segments(tail);
        let hay: Vec<&str> = self.segments().collect();
        !needle.is_empty() && hay.ends_with(&needle)
    }
}

fn split_segments(dotted: &str) -> Vec<&str> {
    dotted.split('.').filter(|s| !s.is_empty()).collect()
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Building a path segment by segment is consistent with every
        /// accessor and matcher.
        #[test]
        fn built_paths_match_themselves(segs in prop::collection::vec("[a-z_]{1,8}", 1..6)) {
            let mut path = FieldPath::root();
            for seg in &segs {
                path = path.child(seg);
            }
            prop_assert_eq!(path.depth(), segs.len());
            prop_assert_eq!(path.last_segment(), segs.last().map(|s| s.as_str()));
            let dotted = path.as_str().to_string();
            prop_assert!(path.matches_exact(&dotted));
            prop_assert!(path.matches_prefix(&dotted));
            let glob_first = format!("**.{}", segs[0]);
            prop_assert!(path.matches_prefix(&glob_first));
            prop_assert!(path.matches_suffix(&segs[segs.len() - 1]));
        }
    }
}
