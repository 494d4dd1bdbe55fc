//! Resolve documents from the command line

use tracing::debug;

use super::{CliError, HttpFetcher};
use crate::{
    AsyncOptions, Document, Fetcher, Value, Variables, extend, parse_path, resolve, resolve_async,
    resolve_at, resolve_at_async, to_plain_object,
};

/// Options for the resolve command
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// JSON document
    pub input: Option<String>,
    /// JSON object of variable bindings
    pub vars: Option<String>,
    /// Only print the value at this location, e.g. `a/b/0`
    pub at: Option<String>,
    /// Resolve resource nodes too
    pub asynchronous: bool,
    /// Fetch resources over HTTP (implies `asynchronous`)
    pub fetch: bool,
    /// Prefix for resource addresses that start with `/`
    pub base_url: Option<String>,
    /// Merge `xf_inherit` / `xf_extend` lists before resolving
    pub extend: bool,
}

/// Execute a resolve operation, returning the resolved JSON.
///
/// Unresolved locations come out as `null`.
pub async fn execute_resolve(options: &ResolveOptions) -> Result<serde_json::Value, CliError> {
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    let json: serde_json::Value = serde_json::from_str(input)?;

    let variables = match &options.vars {
        Some(vars) => {
            let bindings: serde_json::Value = serde_json::from_str(vars)?;
            if !bindings.is_object() {
                return Err(CliError::InvalidVariables);
            }
            Variables::from_json(bindings)
        }
        None => Variables::new(),
    };

    let mut value = Value::from(json);
    if options.extend {
        value = extend(&value, &variables)?;
    }

    let mut doc = Document::new(value);
    let at = options.at.as_deref().map(parse_path);
    debug!(asynchronous = options.asynchronous || options.fetch, at = ?options.at, "resolving document");

    let result = if options.fetch {
        let fetcher = HttpFetcher::new(options.base_url.clone());
        let async_options = AsyncOptions::new(&variables).with_fetcher(&fetcher);
        run_async(&mut doc, at.as_deref(), async_options).await?
    } else if options.asynchronous {
        run_async(&mut doc, at.as_deref(), AsyncOptions::new(&variables)).await?
    } else {
        match &at {
            Some(path) => resolve_at(&mut doc, path, &variables)?,
            None => {
                resolve(&mut doc, &variables)?;
                to_plain_object(&doc)
            }
        }
    };

    Ok(result.to_json())
}

async fn run_async<F: Fetcher>(
    doc: &mut Document,
    at: Option<&[crate::PathSegment]>,
    options: AsyncOptions<'_, F>,
) -> Result<Value, CliError> {
    match at {
        Some(path) => Ok(resolve_at_async(doc, path, options).await?),
        None => {
            resolve_async(doc, options).await?;
            Ok(to_plain_object(doc))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(input: serde_json::Value) -> ResolveOptions {
        ResolveOptions {
            input: Some(input.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolve_with_vars() {
        let opts = ResolveOptions {
            vars: Some(r#"{"name": "Ada"}"#.to_string()),
            ..options(json!({"greeting": ["xf_join", "hi ", "$name"], "missing": "@/nope"}))
        };
        let output = execute_resolve(&opts).await.unwrap();
        assert_eq!(output, json!({"greeting": "hi Ada", "missing": null}));
    }

    #[tokio::test]
    async fn test_resolve_at_location() {
        let opts = ResolveOptions {
            at: Some("b/0".to_string()),
            ..options(json!({"a": [1, 2], "b": ["@/a/1"]}))
        };
        assert_eq!(execute_resolve(&opts).await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_async_without_fetch_leaves_resources_null() {
        let opts = ResolveOptions {
            asynchronous: true,
            ..options(json!({"r": {"method": "GET", "path": "/x"}, "v": "@/r/name"}))
        };
        assert_eq!(execute_resolve(&opts).await.unwrap(), json!({"r": null, "v": null}));
    }

    #[tokio::test]
    async fn test_vars_must_be_an_object() {
        let opts = ResolveOptions {
            vars: Some("[1, 2]".to_string()),
            ..options(json!({}))
        };
        assert!(matches!(
            execute_resolve(&opts).await,
            Err(CliError::InvalidVariables)
        ));
    }

    #[tokio::test]
    async fn test_no_input() {
        assert!(matches!(
            execute_resolve(&ResolveOptions::default()).await,
            Err(CliError::NoInput)
        ));
    }
}
