//! HTTP response types.

use serde::Serialize;
use std::fmt;

/// Content-Type value used for all JSON bodies produced by this crate.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 200 OK
    pub const OK: Self = Self(200);
    /// 204 No Content
    pub const NO_CONTENT: Self = Self(204);
    /// 301 Moved Permanently
    pub const MOVED_PERMANENTLY: Self = Self(301);
    /// 307 Temporary Redirect
    pub const TEMPORARY_REDIRECT: Self = Self(307);
    /// 308 Permanent Redirect
    pub const PERMANENT_REDIRECT: Self = Self(308);
    /// 400 Bad Request
    pub const BAD_REQUEST: Self = Self(400);
    /// 403 Forbidden
    pub const FORBIDDEN: Self = Self(403);
    /// 404 Not Found
    pub const NOT_FOUND: Self = Self(404);
    /// 405 Method Not Allowed
    pub const METHOD_NOT_ALLOWED: Self = Self(405);
    /// 500 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);

    /// Create a status code from a u16.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Check if status code allows a body.
    #[must_use]
    pub const fn allows_body(self) -> bool {
        !matches!(self.0, 100..=103 | 204 | 304)
    }

    /// Check if the status code is a redirection usable with `Location`.
    #[must_use]
    pub const fn is_redirect(self) -> bool {
        matches!(self.0, 300..=308)
    }

    /// Get the canonical reason phrase.
    #[must_use]
    pub const fn canonical_reason(self) -> &'static str {
        match self.0 {
            200 => "OK",
            204 => "No Content",
            301 => "Moved Permanently",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.canonical_reason())
    }
}

/// Response body.
#[derive(Debug, Default)]
pub enum ResponseBody {
    /// Empty body.
    #[default]
    Empty,
    /// Bytes body.
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// Check if body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(b) => b.is_empty(),
        }
    }

    /// Get body length.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Bytes(b) => b.len(),
        }
    }

    /// The body bytes, empty for [`ResponseBody::Empty`].
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::Bytes(b) => b,
        }
    }
}

/// Check if a header name contains only valid HTTP token characters.
///
/// Valid token characters per RFC 7230:
/// `!#$%&'*+-.0-9A-Z^_`a-z|~`
fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            matches!(b,
                b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
                b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
            )
        })
}

/// Strip CR, LF and NUL from a header value to prevent header injection.
fn sanitize_header_value(value: Vec<u8>) -> Vec<u8> {
    if value.iter().any(|&b| b == b'\r' || b == b'\n' || b == 0) {
        value
            .into_iter()
            .filter(|&b| b != b'\r' && b != b'\n' && b != 0)
            .collect()
    } else {
        value
    }
}

/// An HTTP response under construction.
#[derive(Debug, Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: Vec<(String, Vec<u8>)>,
    body: ResponseBody,
}

impl Response {
    /// Create an empty response with no status set yet.
    ///
    /// A response whose status was never set renders as 200 OK.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a 200 OK response.
    #[must_use]
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    /// Create a response with the given status.
    #[must_use]
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            headers: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Create a JSON response with the given status.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::with_status(status)
            .header("Content-Type", CONTENT_TYPE_JSON.as_bytes().to_vec())
            .body(ResponseBody::Bytes(body)))
    }

    /// Create a redirect response pointing at `location`.
    ///
    /// `status` is expected to be a 3xx code; the `Location` value is
    /// sanitized against header injection.
    #[must_use]
    pub fn redirect(status: StatusCode, location: &str) -> Self {
        debug_assert!(status.is_redirect(), "redirect requires a 3xx status");
        Self::with_status(status).header("Location", location.as_bytes().to_vec())
    }

    /// The response status; unset statuses render as 200 OK.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// True if a status was explicitly set.
    #[must_use]
    pub fn has_status(&self) -> bool {
        self.status.is_some()
    }

    /// Set the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Builder-style header append. Invalid header names are discarded;
    /// values are stripped of CR/LF/NUL.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.append_header(name, value);
        self
    }

    /// Append a header.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        let name = name.into();
        if !is_valid_header_name(&name) {
            return;
        }
        self.headers.push((name, sanitize_header_value(value.into())));
    }

    /// Set a header, replacing any previous value with the same name
    /// (case-insensitive).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        let name = name.into();
        self.headers
            .retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.append_header(name, value);
    }

    /// First header value with the given name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// First header value as UTF-8 text.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header_value(name)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// All headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, Vec<u8>)] {
        &self.headers
    }

    /// Builder-style body replacement.
    #[must_use]
    pub fn body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: ResponseBody) {
        self.body = body;
    }

    /// The response body.
    #[must_use]
    pub fn body_ref(&self) -> &ResponseBody {
        &self.body
    }

    /// The body rendered as UTF-8 text, for assertions in tests.
    #[must_use]
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.body.as_bytes())
    }
}
