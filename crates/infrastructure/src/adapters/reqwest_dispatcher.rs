//! Request dispatch using reqwest.
//!
//! This adapter implements the `RequestDispatcher` port. Response bodies
//! that are too large or not UTF-8 are written to a temporary file instead
//! of being held in memory.

use std::time::{Duration, Instant};

use courier_application::{DispatchError, RequestDispatcher};
use courier_domain::request::{HttpMethod, PreparedRequest};
use courier_domain::response::{HttpResponse, ResponseBody, StatusCode};
use courier_domain::settings::HttpSettings;
use reqwest::{Client, Method};
use tracing::debug;

/// Dispatcher backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestDispatcher {
    client: Client,
    settings: HttpSettings,
}

impl ReqwestDispatcher {
    /// Creates a dispatcher from the HTTP settings.
    ///
    /// Redirects are followed up to 10 hops.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(settings: HttpSettings) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_millis(settings.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| DispatchError::Other(e.to_string()))?;

        Ok(Self { client, settings })
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    /// Maps reqwest errors to `DispatchError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> DispatchError {
        if error.is_timeout() {
            return DispatchError::Timeout { timeout_ms };
        }
        if error.is_connect() {
            return DispatchError::Connection(error.to_string());
        }
        if error.is_builder() {
            return DispatchError::InvalidRequest(error.to_string());
        }
        if error.is_body() || error.is_decode() {
            return DispatchError::Body(error.to_string());
        }
        DispatchError::Other(error.to_string())
    }

    /// Keeps UTF-8 bodies up to the inline limit in memory; everything else
    /// goes to a temporary file that outlives the dispatcher.
    async fn store_body(bytes: Vec<u8>, max_inline: u64) -> Result<ResponseBody, DispatchError> {
        let size = bytes.len() as u64;
        let bytes = if size <= max_inline {
            match String::from_utf8(bytes) {
                Ok(content) => return Ok(ResponseBody::Text { content }),
                Err(err) => err.into_bytes(),
            }
        } else {
            bytes
        };

        let (_, path) = tempfile::Builder::new()
            .prefix("courier-body-")
            .suffix(".bin")
            .tempfile()
            .and_then(|file| file.keep().map_err(|e| e.error))
            .map_err(|e| DispatchError::Body(e.to_string()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| DispatchError::Body(e.to_string()))?;
        debug!(size, path = %path.display(), "response body stored on disk");
        Ok(ResponseBody::Stored { path, size })
    }
}

impl RequestDispatcher for ReqwestDispatcher {
    async fn dispatch(&self, request: &PreparedRequest) -> Result<HttpResponse, DispatchError> {
        let url = request
            .full_url()
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;
        let timeout_ms = self.settings.timeout_ms;
        debug!(method = %request.method, %url, "dispatching request");

        let start = Instant::now();
        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url);

        for header in request.headers.enabled() {
            builder = builder.header(header.key.as_str(), header.value.as_str());
        }

        if request.method.sends_body() && !request.body.is_empty() {
            if let Some(content_type) = request.body.content_type()
                && !request.headers.has("content-type")
            {
                builder = builder.header("Content-Type", content_type);
            }
            builder = builder.body(request.body.content.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?
            .to_vec();
        let elapsed = start.elapsed();
        let body = Self::store_body(bytes, self.settings.max_inline_body_bytes).await?;

        let status = StatusCode::new(status.as_u16());
        Ok(HttpResponse {
            status,
            status_text: status.reason_phrase().to_string(),
            headers,
            body,
            elapsed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use courier_domain::request::RequestSpec;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(ReqwestDispatcher::to_reqwest_method(HttpMethod::Get), Method::GET);
        assert_eq!(ReqwestDispatcher::to_reqwest_method(HttpMethod::Post), Method::POST);
        assert_eq!(ReqwestDispatcher::to_reqwest_method(HttpMethod::Delete), Method::DELETE);
    }

    #[test]
    fn test_client_creation() {
        assert!(ReqwestDispatcher::new(HttpSettings::default()).is_ok());
    }

    #[tokio::test]
    async fn test_small_text_body_stays_inline() {
        let body = ReqwestDispatcher::store_body(b"{\"ok\":true}".to_vec(), 64)
            .await
            .unwrap();
        assert_eq!(body.text(), Some("{\"ok\":true}"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_stored() {
        let body = ReqwestDispatcher::store_body(vec![b'a'; 100], 10).await.unwrap();

        let ResponseBody::Stored { path, size } = body else {
            panic!("expected a stored body");
        };
        assert_eq!(size, 100);
        assert_eq!(std::fs::read(&path).unwrap().len(), 100);
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_binary_body_is_stored() {
        let body = ReqwestDispatcher::store_body(vec![0xff, 0xfe, 0x00], 1024)
            .await
            .unwrap();

        assert_eq!(body.text(), None);
        assert_eq!(body.size(), 3);
        if let ResponseBody::Stored { path, .. } = body {
            std::fs::remove_file(path).unwrap();
        }
    }

    #[tokio::test]
    async fn test_relative_url_is_rejected_before_sending() {
        let dispatcher = ReqwestDispatcher::new(HttpSettings::default()).unwrap();
        let request = PreparedRequest::from_spec(&RequestSpec::get("Broken", "/no-host"));

        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidRequest(_)));
    }
}
