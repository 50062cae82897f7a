//! HTTP request body types

use serde::{Deserialize, Serialize};

/// The kind of request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBodyKind {
    /// No body
    #[default]
    None,
    /// Raw text body with an explicit content type
    Raw {
        /// The content type (e.g., "application/json", "text/plain")
        content_type: String,
    },
    /// Form URL encoded body
    FormUrlEncoded,
}

/// Textual request body. Templates may contain `{{var}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestBody {
    /// The kind of body
    #[serde(default)]
    pub kind: RequestBodyKind,
    /// The body content
    #[serde(default)]
    pub content: String,
}

impl RequestBody {
    /// Creates an empty body.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            kind: RequestBodyKind::None,
            content: String::new(),
        }
    }

    /// Creates a JSON body.
    #[must_use]
    pub fn json(content: impl Into<String>) -> Self {
        Self::raw("application/json", content)
    }

    /// Creates a raw body with the given content type.
    #[must_use]
    pub fn raw(content_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: RequestBodyKind::Raw {
                content_type: content_type.into(),
            },
            content: content.into(),
        }
    }

    /// Returns whether there is nothing to send.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, RequestBodyKind::None) || self.content.is_empty()
    }

    /// Returns the content type, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        match &self.kind {
            RequestBodyKind::None => None,
            RequestBodyKind::Raw { content_type } => Some(content_type),
            RequestBodyKind::FormUrlEncoded => Some("application/x-www-form-urlencoded"),
        }
    }
}
