//! The in-flight request built from a template.
//!
//! A [`PreparedRequest`] is rebuilt from its [`RequestSpec`] for every
//! execution, so mutations made by one script never bleed into the next
//! iteration.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{Headers, HttpMethod, QueryParams, RequestBody, RequestSpec};
use crate::error::{DomainError, DomainResult};

/// A request ready for interpolation, scripting and dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// URL without its query string.
    pub url: String,
    /// Ordered header entries.
    pub headers: Headers,
    /// Ordered query parameters; inline parameters from the template come first.
    pub query: QueryParams,
    /// Request body.
    pub body: RequestBody,
}

impl PreparedRequest {
    /// Build a fresh request from a template.
    ///
    /// An inline query string in the template URL is split into parameters
    /// placed ahead of the template's own parameter list.
    #[must_use]
    pub fn from_spec(spec: &RequestSpec) -> Self {
        let (url, mut query) = match spec.url.split_once('?') {
            Some((base, raw)) => (base.to_string(), QueryParams::parse(raw)),
            None => (spec.url.clone(), QueryParams::new()),
        };
        query.extend(spec.query.clone());

        Self {
            method: spec.method,
            url,
            headers: spec.headers.clone(),
            query,
            body: spec.body.clone(),
        }
    }

    /// Rewrite every textual field through `f`.
    ///
    /// Used for variable interpolation: the URL, header keys and values,
    /// query keys and values, and the body content all pass through.
    pub fn map_text<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        self.url = f(&self.url);
        for header in self.headers.iter_mut() {
            header.key = f(&header.key);
            header.value = f(&header.value);
        }
        for param in self.query.iter_mut() {
            param.key = f(&param.key);
            param.value = f(&param.value);
        }
        self.body.content = f(&self.body.content);
    }

    /// The URL with enabled query parameters appended verbatim.
    #[must_use]
    pub fn url_string(&self) -> String {
        let query = self.query.to_query_string();
        if query.is_empty() {
            self.url.clone()
        } else if self.url.contains('?') {
            format!("{}&{query}", self.url)
        } else {
            format!("{}?{query}", self.url)
        }
    }

    /// Parse the full URL.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] when the assembled URL is not an
    /// absolute URL.
    pub fn full_url(&self) -> DomainResult<Url> {
        let raw = self.url_string();
        Url::parse(&raw).map_err(|e| DomainError::InvalidUrl(format!("{raw}: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::request::{Header, QueryParam};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inline_query_is_split() {
        let spec = RequestSpec::get("Search", "https://example.com/search?q=rust&page=2")
            .with_query("limit", "10");
        let prepared = PreparedRequest::from_spec(&spec);

        assert_eq!(prepared.url, "https://example.com/search");
        let keys: Vec<&str> = prepared.query.all().iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["q", "page", "limit"]);
    }

    #[test]
    fn test_full_url_keeps_values_verbatim() {
        let mut prepared = PreparedRequest {
            url: "https://example.com/login".to_string(),
            ..PreparedRequest::default()
        };
        prepared.query.add(QueryParam::new("password", "abc%2B%3D%3D"));
        prepared.query.add(QueryParam::disabled("debug", "1"));

        let url = prepared.full_url().unwrap();
        assert_eq!(url.as_str(), "https://example.com/login?password=abc%2B%3D%3D");
    }

    #[test]
    fn test_full_url_rejects_relative() {
        let prepared = PreparedRequest {
            url: "{{host}}/path".to_string(),
            ..PreparedRequest::default()
        };
        assert!(matches!(prepared.full_url(), Err(DomainError::InvalidUrl(_))));
    }

    #[test]
    fn test_map_text_touches_every_field() {
        let mut prepared = PreparedRequest {
            url: "a".to_string(),
            body: RequestBody::json("a"),
            ..PreparedRequest::default()
        };
        prepared.headers.add(Header::new("a", "a"));
        prepared.query.add(QueryParam::new("a", "a"));

        prepared.map_text(|s| s.replace('a', "b"));

        assert_eq!(prepared.url, "b");
        assert_eq!(prepared.headers.get("b"), Some("b"));
        assert_eq!(prepared.query.get("b"), Some("b"));
        assert_eq!(prepared.body.content, "b");
    }
}
