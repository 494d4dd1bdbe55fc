//! The fetch collaborator used by asynchronous resolution.

use std::future::{self, Future};

use crate::{context::Variables, error::FetchError, value::Value};

/// A fully resolved resource definition, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Upper-cased method, e.g. `GET`
    pub method: String,
    /// Resolved `path` of the resource, used verbatim as the address
    pub address: String,
    pub query: Option<Value>,
    /// Only carried for `POST`, `PUT` and `PATCH`
    pub body: Option<Value>,
    pub headers: Option<Value>,
}

impl FetchRequest {
    /// Whether this method carries a body.
    pub fn has_body(method: &str) -> bool {
        matches!(method, "POST" | "PUT" | "PATCH")
    }
}

/// Performs resource fetches for [`crate::resolve_async`].
///
/// Any `Fn(FetchRequest) -> impl Future<Output = Result<Value, FetchError>>`
/// is a fetcher, so async closures work directly:
///
/// ```
/// use resolve_json::{FetchError, FetchRequest, Value};
///
/// let fetcher = |req: FetchRequest| async move {
///     Ok::<_, FetchError>(Value::from(req.address))
/// };
/// # let _ = fetcher;
/// ```
pub trait Fetcher {
    fn fetch(&self, request: FetchRequest) -> impl Future<Output = Result<Value, FetchError>>;
}

impl<F, Fut> Fetcher for F
where
    F: Fn(FetchRequest) -> Fut,
    Fut: Future<Output = Result<Value, FetchError>>,
{
    fn fetch(&self, request: FetchRequest) -> impl Future<Output = Result<Value, FetchError>> {
        self(request)
    }
}

/// Placeholder fetcher type for calls made without one. Never invoked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetch;

impl Fetcher for NoFetch {
    fn fetch(&self, request: FetchRequest) -> impl Future<Output = Result<Value, FetchError>> {
        future::ready(Err(FetchError::new(
            request.method,
            request.address,
            "no fetcher configured",
        )))
    }
}

/// Options for [`crate::resolve_async`] and [`crate::resolve_at_async`].
///
/// # Examples
///
/// ```
/// use resolve_json::{AsyncOptions, FetchError, FetchRequest, Value, Variables};
///
/// let vars = Variables::new();
/// let fetcher = |_req: FetchRequest| async { Ok::<_, FetchError>(Value::Null) };
/// let options = AsyncOptions::new(&vars).with_fetcher(&fetcher);
/// assert!(options.fetch_resource.is_some());
/// ```
#[derive(Debug)]
pub struct AsyncOptions<'a, F = NoFetch> {
    pub variables: &'a Variables,
    /// Without a fetcher resources stay unresolved
    pub fetch_resource: Option<&'a F>,
}

impl<'a> AsyncOptions<'a, NoFetch> {
    pub fn new(variables: &'a Variables) -> Self {
        AsyncOptions {
            variables,
            fetch_resource: None,
        }
    }
}

impl<'a, F> AsyncOptions<'a, F> {
    pub fn with_fetcher<G: Fetcher>(self, fetcher: &'a G) -> AsyncOptions<'a, G> {
        AsyncOptions {
            variables: self.variables,
            fetch_resource: Some(fetcher),
        }
    }
}

impl<F> Clone for AsyncOptions<'_, F> {
    fn clone(&self) -> Self {
        AsyncOptions {
            variables: self.variables,
            fetch_resource: self.fetch_resource,
        }
    }
}
