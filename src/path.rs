use std::fmt;

use crate::{error::ResolveError, value::Value};

/// A segment in a location inside a document.
///
/// Field segments that spell a non-negative integer also address array
/// elements, and index segments address object keys by their decimal
/// spelling, so `"@/items/0"` and `["@@/items", 0]` reach the same cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key
    ///
    /// # Examples
    /// - `"@/user/name"` → `[Field("user"), Field("name")]`
    /// - `"@../sibling"` → `[Field(".."), Field("sibling")]` before folding
    Field(String),

    /// Array position
    ///
    /// Only produced by integer values, either resolved path arguments or
    /// positions in a traversal.
    Index(usize),
}

impl PathSegment {
    /// Position this segment addresses in an array, if any.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Field(s) => {
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                s.parse().ok()
            }
        }
    }

    /// Key this segment addresses in an object.
    pub fn as_key(&self) -> String {
        match self {
            PathSegment::Field(s) => s.clone(),
            PathSegment::Index(i) => i.to_string(),
        }
    }

    /// Turn a resolved path argument into a segment.
    ///
    /// Non-negative integers become indices, everything else is keyed by its
    /// string coercion. Returns `None` for the sentinel.
    pub fn from_value(value: &Value) -> Option<PathSegment> {
        match value {
            Value::Unresolved => None,
            Value::Integer(n) if *n >= 0 => Some(PathSegment::Index(*n as usize)),
            Value::String(s) => Some(PathSegment::Field(s.clone())),
            other => Some(PathSegment::Field(other.as_string())),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(s) => write!(f, "{}", s),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        PathSegment::Field(s.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

/// A sequence of segments from the document root to a location.
pub type Path = Vec<PathSegment>;

/// Parse a slash-separated location such as `a/b/0` (leading `/` optional).
pub fn parse_path(s: &str) -> Path {
    s.split('/')
        .filter(|part| !part.is_empty())
        .map(PathSegment::from)
        .collect()
}

/// Render a location as `/a/b/0`.
pub fn display_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        out.push('/');
        out.push_str(&segment.to_string());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// One part of a path under construction. Resolved arguments may still be
/// pending, which makes the whole path invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum PathPart {
    Segment(PathSegment),
    Unresolved,
}

impl From<PathSegment> for PathPart {
    fn from(segment: PathSegment) -> Self {
        PathPart::Segment(segment)
    }
}

/// Strip the addressing prefix of a reference head (`@@/`, `@@`, `@/`, `@`)
/// and split the rest on `/`, discarding empty segments.
pub fn path_from_string(def: &str) -> Path {
    let rest = def
        .strip_prefix("@@/")
        .or_else(|| def.strip_prefix("@@"))
        .or_else(|| def.strip_prefix("@/"))
        .or_else(|| def.strip_prefix('@'))
        .unwrap_or("");
    parse_path(rest)
}

/// Fold path parts left to right: `.` stays, `..` drops the last segment,
/// anything else is appended.
///
/// Pending parts are carried through untouched, so [`into_path`] rejects
/// the result. Ascending past the root is an error.
pub fn abs_path(parts: impl IntoIterator<Item = PathPart>) -> Result<Vec<PathPart>, ResolveError> {
    let parts: Vec<PathPart> = parts.into_iter().collect();
    let mut acc: Vec<PathPart> = Vec::with_capacity(parts.len());

    for part in &parts {
        match part {
            PathPart::Segment(PathSegment::Field(s)) if s == "." => {}
            PathPart::Segment(PathSegment::Field(s)) if s == ".." => {
                if acc.pop().is_none() {
                    return Err(ResolveError::InvalidPath {
                        path: render_parts(&parts),
                    });
                }
            }
            other => acc.push(other.clone()),
        }
    }

    Ok(acc)
}

/// Convert fully known parts into a path.
pub fn into_path(parts: Vec<PathPart>) -> Option<Path> {
    parts
        .into_iter()
        .map(|p| match p {
            PathPart::Segment(s) => Some(s),
            PathPart::Unresolved => None,
        })
        .collect()
}

fn render_parts(parts: &[PathPart]) -> String {
    parts
        .iter()
        .map(|p| match p {
            PathPart::Segment(s) => s.to_string(),
            PathPart::Unresolved => "<unresolved>".to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
