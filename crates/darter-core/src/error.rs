//! JSON error bodies.

use serde::Serialize;
use std::fmt;

use crate::response::{CONTENT_TYPE_JSON, Response, ResponseBody, StatusCode};

/// An error that occurred while handling a request.
///
/// Rendered as a JSON body of the shape `{"error":"<message>"}` with the
/// corresponding status code. The router's default 404 and 405 responses
/// are built from this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    code: StatusCode,
    message: String,
}

impl HttpError {
    /// Create an error with an explicit message.
    #[must_use]
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an error whose message is the status code's reason phrase.
    #[must_use]
    pub fn from_status(code: StatusCode) -> Self {
        Self::new(code, code.canonical_reason())
    }

    /// The status code.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Render the error as a JSON response.
    #[must_use]
    pub fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body<'a> {
            error: &'a str,
        }

        let body = serde_json::to_vec(&Body {
            error: &self.message,
        })
        .unwrap_or_default();

        Response::with_status(self.code)
            .header("Content-Type", CONTENT_TYPE_JSON.as_bytes().to_vec())
            .body(ResponseBody::Bytes(body))
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for HttpError {}
