//! Request template type

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Header, Headers, HttpMethod, QueryParam, QueryParams, RequestBody};
use crate::scripting::{RequestScripts, Script};

/// A stored request template. Fields may contain `{{var}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Unique identifier for this request
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    /// Human-readable name
    pub name: String,
    /// HTTP method
    #[serde(default)]
    pub method: HttpMethod,
    /// Target URL; may carry an inline query string
    pub url: String,
    /// Query parameters appended after any inline ones
    #[serde(default)]
    pub query: QueryParams,
    /// HTTP headers
    #[serde(default)]
    pub headers: Headers,
    /// Request body
    #[serde(default)]
    pub body: RequestBody,
    /// Pre-request and post-response scripts
    #[serde(default)]
    pub scripts: RequestScripts,
}

impl RequestSpec {
    /// Creates a request template with the given method and URL.
    #[must_use]
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            method,
            url: url.into(),
            query: QueryParams::new(),
            headers: Headers::new(),
            body: RequestBody::none(),
            scripts: RequestScripts::default(),
        }
    }

    /// Creates a GET request template.
    #[must_use]
    pub fn get(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Get, url)
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.add(QueryParam::new(key, value));
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(Header::new(key, value));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets the pre-request script.
    #[must_use]
    pub fn with_pre_request(mut self, source: impl Into<String>) -> Self {
        self.scripts.pre_request = Script::with_content(source);
        self
    }

    /// Sets the post-response script.
    #[must_use]
    pub fn with_post_response(mut self, source: impl Into<String>) -> Self {
        self.scripts.post_response = Script::with_content(source);
        self
    }

    /// Returns true if the URL contains variable placeholders.
    #[must_use]
    pub fn has_variables(&self) -> bool {
        self.url.contains("{{") && self.url.contains("}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let req = RequestSpec::get("Login", "https://{{host}}/login")
            .with_query("username", "testuser")
            .with_header("Accept", "application/json")
            .with_pre_request("pm.variables.set('a', '1');");

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.query.len(), 1);
        assert!(req.headers.has("accept"));
        assert!(req.scripts.pre_request.should_run());
        assert!(!req.scripts.post_response.should_run());
        assert!(req.has_variables());
    }

    #[test]
    fn test_deserialize_minimal() {
        let req: RequestSpec =
            serde_json::from_str(r#"{"name": "Ping", "url": "https://example.com"}"#)
                .unwrap_or_else(|_| RequestSpec::get("broken", ""));
        assert_eq!(req.name, "Ping");
        assert!(req.query.is_empty());
    }
}
