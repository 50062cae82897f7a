//! Request dispatch port

use std::future::Future;

use courier_domain::request::PreparedRequest;
use courier_domain::response::HttpResponse;
use thiserror::Error;

/// Reasons a request could not be delivered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The request could not be built (bad URL, header or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request did not finish in time.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The response body could not be read or stored.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Port for sending a prepared request.
///
/// The transport itself lives outside the core; the orchestrator only
/// needs this narrow contract.
pub trait RequestDispatcher: Send + Sync {
    /// Sends `request` and returns the response.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the request cannot be delivered or
    /// the response cannot be read.
    fn dispatch(
        &self,
        request: &PreparedRequest,
    ) -> impl Future<Output = Result<HttpResponse, DispatchError>> + Send;
}
