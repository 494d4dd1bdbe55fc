//! Blocking HTTP transport for resource nodes.

use std::future::Future;

use tracing::debug;
use ureq::{Agent, RequestBuilder};

use crate::{FetchError, FetchRequest, Fetcher, Value};

/// Sends resource requests with `ureq` on tokio's blocking pool.
///
/// `GET` and `DELETE` carry the query as a query string; `POST`, `PUT` and
/// `PATCH` also send the body as JSON (`{}` when absent). Headers are
/// forwarded as given. Addresses starting with `/` are joined to `base_url`.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
    base_url: Option<String>,
}

impl HttpFetcher {
    pub fn new(base_url: Option<String>) -> Self {
        HttpFetcher {
            agent: Agent::new_with_defaults(),
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    fn url_for(&self, address: &str) -> String {
        match &self.base_url {
            Some(base) if address.starts_with('/') => format!("{}{}", base, address),
            _ => address.to_string(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: FetchRequest) -> impl Future<Output = Result<Value, FetchError>> {
        let agent = self.agent.clone();
        let url = self.url_for(&request.address);

        async move {
            let method = request.method.clone();
            let address = request.address.clone();
            let fail = |message: String| FetchError::new(method.clone(), address.clone(), message);

            debug!(%method, %url, "sending request");
            let response = tokio::task::spawn_blocking(move || send(&agent, &url, &request))
                .await
                .map_err(|e| fail(e.to_string()))?
                .map_err(|e| fail(e.to_string()))?;

            Ok(Value::from(response))
        }
    }
}

fn send(agent: &Agent, url: &str, request: &FetchRequest) -> Result<serde_json::Value, ureq::Error> {
    let query = pairs(request.query.as_ref());
    let headers = pairs(request.headers.as_ref());

    let mut response = match request.method.as_str() {
        "POST" | "PUT" | "PATCH" => {
            let builder = match request.method.as_str() {
                "POST" => agent.post(url),
                "PUT" => agent.put(url),
                _ => agent.patch(url),
            };
            let body = request
                .body
                .as_ref()
                .map(Value::to_json)
                .unwrap_or_else(|| serde_json::json!({}));
            decorate(builder, &query, &headers).send_json(&body)?
        }
        "DELETE" => decorate(agent.delete(url), &query, &headers).call()?,
        _ => decorate(agent.get(url), &query, &headers).call()?,
    };

    response.body_mut().read_json()
}

fn decorate<B>(
    mut builder: RequestBuilder<B>,
    query: &[(String, String)],
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    for (key, value) in query {
        builder = builder.query(key, value);
    }
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Key/value pairs of an object, values in their string coercion.
fn pairs(value: Option<&Value>) -> Vec<(String, String)> {
    match value {
        Some(Value::Object(fields)) => fields
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Null))
            .map(|(k, v)| (k.clone(), v.as_string()))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_is_joined_to_absolute_paths() {
        let fetcher = HttpFetcher::new(Some("https://api.example.com/".to_string()));
        assert_eq!(fetcher.url_for("/users"), "https://api.example.com/users");
        assert_eq!(fetcher.url_for("https://other.example.com/x"), "https://other.example.com/x");
    }

    #[test]
    fn test_query_pairs_use_string_coercion() {
        let query = Value::from(json!({"id": 7, "tags": ["a", "b"], "skip": null}));
        assert_eq!(
            pairs(Some(&query)),
            vec![
                ("id".to_string(), "7".to_string()),
                ("tags".to_string(), "a,b".to_string()),
            ]
        );
    }
}
