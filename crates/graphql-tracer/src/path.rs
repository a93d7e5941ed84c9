//! Response-position paths and their string keys.
//!
//! A [`ResponsePath`] locates one value in a GraphQL response document: a
//! sequence of field names and array indexes from the root. The joined key
//! (segments separated by `.`) is the sole correlation mechanism between
//! asynchronous resolution events and trace tree nodes, so it must be
//! deterministic and collision-free. GraphQL field names cannot contain `.`,
//! and index segments stringify to bare digits, so the separator cannot
//! collide with either.

use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// One step in a response path: a field name or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// An immutable response position with its cached string key.
///
/// Child paths are built incrementally from their parent, so the key is
/// never recomputed by re-traversal. The root path has no segments and the
/// empty string as its key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResponsePath {
    segments: Vec<PathSegment>,
    key: String,
}

impl ResponsePath {
    /// The root position (no segments, empty key).
    pub fn root() -> Self {
        ResponsePath {
            segments: Vec::new(),
            key: String::new(),
        }
    }

    /// Child position under a response field name.
    pub fn field(&self, name: impl Into<String>) -> Self {
        self.child(PathSegment::Field(name.into()))
    }

    /// Child position at an array index.
    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    fn child(&self, segment: PathSegment) -> Self {
        let mut key = String::with_capacity(self.key.len() + 8);
        key.push_str(&self.key);
        if !self.segments.is_empty() {
            key.push('.');
        }
        match &segment {
            PathSegment::Field(name) => key.push_str(name),
            PathSegment::Index(i) => key.push_str(&i.to_string()),
        }
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        ResponsePath { segments, key }
    }

    /// Builds a path from owned segments, joining the key once.
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        let mut path = ResponsePath::root();
        for segment in segments {
            path = path.child(segment);
        }
        path
    }

    /// The parent position, or `None` at the root.
    pub fn parent(&self) -> Option<ResponsePath> {
        if self.segments.is_empty() {
            return None;
        }
        let segments = self.segments[..self.segments.len() - 1].to_vec();
        let key = match self.key.rfind('.') {
            Some(dot) => self.key[..dot].to_string(),
            None => String::new(),
        };
        Some(ResponsePath { segments, key })
    }

    /// The joined string key for this position.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The terminal segment, or `None` at the root.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

// Serializes in the JSON form GraphQL uses for error paths: an array of
// strings and numbers, e.g. ["friends", 0, "name"].
impl Serialize for ResponsePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.segments.len()))?;
        for segment in &self.segments {
            match segment {
                PathSegment::Field(name) => seq.serialize_element(name)?,
                PathSegment::Index(i) => seq.serialize_element(i)?,
            }
        }
        seq.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_root_key_is_empty() {
        assert_eq!(ResponsePath::root().key(), "");
        assert!(ResponsePath::root().is_root());
        assert!(ResponsePath::root().parent().is_none());
    }

    #[test]
    fn test_key_joins_fields_and_indexes() {
        let path = ResponsePath::root().field("field").index(2).field("subfield");
        assert_eq!(path.key(), "field.2.subfield");
    }

    #[test]
    fn test_parent_strips_terminal_segment() {
        let path = ResponsePath::root().field("friends").index(0).field("name");
        let parent = path.parent().unwrap();
        assert_eq!(parent.key(), "friends.0");
        assert_eq!(parent.last(), Some(&PathSegment::Index(0)));
        let grandparent = parent.parent().unwrap();
        assert_eq!(grandparent.key(), "friends");
        assert_eq!(grandparent.parent().unwrap().key(), "");
    }

    #[test]
    fn test_from_segments_matches_incremental_build() {
        let incremental = ResponsePath::root().field("a").index(10).field("b");
        let at_once = ResponsePath::from_segments(vec![
            PathSegment::Field("a".to_string()),
            PathSegment::Index(10),
            PathSegment::Field("b".to_string()),
        ]);
        assert_eq!(incremental, at_once);
        assert_eq!(at_once.key(), "a.10.b");
    }

    #[test]
    fn test_serializes_as_json_array() {
        let path = ResponsePath::root().field("friends").index(0).field("name");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "[\"friends\",0,\"name\"]");
    }
}
