//! Resolution of JSON documents with embedded expressions.
//!
//! Documents are ordinary JSON in which some strings and arrays are
//! expressions:
//!
//! - `"$name"` reads a variable, `"$"` the current element inside `xf_map`
//! - `"@/a/b"` and `["@@/a", ...args]` read another location of the document;
//!   `"@b"` and `["@@b", ...args]` do the same relative to the parent
//! - `["xf_<op>", ...args]` applies a transform
//! - `{ "method": .., "path": .. }` fetches a resource (asynchronous calls only)
//!
//! [`resolve`] computes everything it can and leaves the rest
//! [`Value::Unresolved`]. Calling it again on the same [`Document`] with more
//! variables continues from there.
//!
//! ```
//! use resolve_json::{Document, Variables, resolve, to_plain_object};
//! use serde_json::json;
//!
//! let mut doc = Document::from_json(json!({
//!     "user": {"first": "Ada", "last": "Lovelace"},
//!     "title": ["xf_join", "$greeting", " ", "@/user/first"],
//! }));
//!
//! resolve(&mut doc, &Variables::new()).unwrap();
//! assert!(to_plain_object(&doc).get_field("title").unwrap().is_unresolved());
//!
//! let vars = Variables::new().with("greeting", "Hello");
//! resolve(&mut doc, &vars).unwrap();
//! assert_eq!(to_plain_object(&doc).to_json()["title"], json!("Hello Ada"));
//! ```

pub mod context;
pub mod date;
pub mod error;
pub mod extend;
pub mod fetch;
pub mod literal;
pub mod node;
pub mod path;
pub mod project;
mod resolver;
mod scheduler;
pub mod transform;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use context::{ResolveContext, Variables};
pub use error::{FetchError, ResolveError};
pub use extend::extend;
pub use fetch::{AsyncOptions, FetchRequest, Fetcher, NoFetch};
pub use literal::Mode;
pub use node::{Cell, CellId, Document, Node, NodeKind};
pub use path::{Path, PathSegment, parse_path};
pub use project::to_plain_object;
pub use value::Value;

use resolver::Resolver;

/// Resolve every expression in `doc` that the current variables allow.
pub fn resolve(doc: &mut Document, variables: &Variables) -> Result<(), ResolveError> {
    Resolver::new(doc, variables, Mode::Sync).resolve_all()
}

/// Resolve the location at `path` on demand and return its value.
///
/// Only what the location needs is evaluated. A variable at `path` is always
/// re-read from `variables`.
pub fn resolve_at(
    doc: &mut Document,
    path: &[PathSegment],
    variables: &Variables,
) -> Result<Value, ResolveError> {
    Resolver::new(doc, variables, Mode::Sync).resolve_at(path)
}

/// Resolve `doc` including resource nodes, fetching each resource at most once
/// over the lifetime of the document.
///
/// # Examples
///
/// ```
/// use resolve_json::{
///     AsyncOptions, Document, FetchError, FetchRequest, Value, Variables, resolve_async,
///     to_plain_object,
/// };
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut doc = Document::from_json(json!({
///     "user": {"method": "GET", "path": "/users/1"},
///     "name": "@/user/name",
/// }));
/// let fetcher = |_req: FetchRequest| async { Ok::<_, FetchError>(Value::from(json!({"name": "Ada"}))) };
///
/// let vars = Variables::new();
/// resolve_async(&mut doc, AsyncOptions::new(&vars).with_fetcher(&fetcher)).await.unwrap();
/// assert_eq!(to_plain_object(&doc).to_json()["name"], json!("Ada"));
/// # });
/// ```
pub async fn resolve_async<F: Fetcher>(
    doc: &mut Document,
    options: AsyncOptions<'_, F>,
) -> Result<(), ResolveError> {
    let mut resolver = Resolver::new(doc, options.variables, Mode::Async);
    resolver.resolve_all()?;
    scheduler::run(&mut resolver, options.fetch_resource).await
}

/// Asynchronous [`resolve_at`]: resolves `path`, runs every task it started,
/// and returns the value found there afterwards.
pub async fn resolve_at_async<F: Fetcher>(
    doc: &mut Document,
    path: &[PathSegment],
    options: AsyncOptions<'_, F>,
) -> Result<Value, ResolveError> {
    let mut resolver = Resolver::new(doc, options.variables, Mode::Async);
    resolver.resolve_at(path)?;
    scheduler::run(&mut resolver, options.fetch_resource).await?;
    resolver.value_at(path)
}
