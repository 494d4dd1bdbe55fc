use thiserror::Error;

/// Fatal problems found while resolving a document.
///
/// Pending inputs are never errors: they surface as [`crate::Value::Unresolved`]
/// at the affected locations. Everything here means the document (or the fetch
/// collaborator) cannot make progress and the whole pass is aborted.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A relative reference climbed above the document root with `..`
    #[error("invalid path {path}: ascends past the document root")]
    InvalidPath { path: String },

    /// An `xf_` tag that names no known operator
    #[error("unknown transform {0}")]
    UnknownTransform(String),

    /// An operator received the wrong number of arguments
    #[error("{op} expects {expected} argument(s), got {found}")]
    Arity {
        op: &'static str,
        expected: &'static str,
        found: usize,
    },

    /// `xf_map`, `xf_some` and `xf_first` applied to pre-evaluated arguments
    #[error("{0} evaluates its arguments per element and cannot be applied directly")]
    Iterating(&'static str),

    /// A node needs its own value to compute its value
    #[error("reference cycle at {location}")]
    Cycle { location: String },

    /// The injected fetch collaborator failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Failure reported by a [`crate::Fetcher`].
#[derive(Debug, Error)]
#[error("{method} {address}: {message}")]
pub struct FetchError {
    pub method: String,
    pub address: String,
    pub message: String,
}

impl FetchError {
    pub fn new(
        method: impl Into<String>,
        address: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        FetchError {
            method: method.into(),
            address: address.into(),
            message: message.into(),
        }
    }
}
