//! HTTP request domain types

mod body;
mod header;
mod method;
mod prepared;
mod query;
mod spec;

pub use body::{RequestBody, RequestBodyKind};
pub use header::{Header, Headers};
pub use method::HttpMethod;
pub use prepared::PreparedRequest;
pub use query::{QueryParam, QueryParams};
pub use spec::RequestSpec;
