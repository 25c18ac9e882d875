//! HTTP request types.

use std::collections::HashMap;
use std::fmt;

/// Canonical HTTP method names.
///
/// The router keys its trees by method *string* so that non-standard or
/// custom methods (e.g. `PROPFIND`, proxy-internal verbs) can be registered
/// alongside the usual ones.
pub mod method {
    /// The GET method.
    pub const GET: &str = "GET";
    /// The HEAD method.
    pub const HEAD: &str = "HEAD";
    /// The POST method.
    pub const POST: &str = "POST";
    /// The PUT method.
    pub const PUT: &str = "PUT";
    /// The PATCH method.
    pub const PATCH: &str = "PATCH";
    /// The DELETE method.
    pub const DELETE: &str = "DELETE";
    /// The CONNECT method.
    pub const CONNECT: &str = "CONNECT";
    /// The OPTIONS method.
    pub const OPTIONS: &str = "OPTIONS";
    /// The TRACE method.
    pub const TRACE: &str = "TRACE";
}

/// HTTP headers collection.
///
/// Header names are matched case-insensitively; values are raw bytes.
#[derive(Debug, Default, Clone)]
pub struct Headers {
    inner: HashMap<String, Vec<u8>>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// Get a header value as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.inner
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Check whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// An incoming HTTP request, as seen by the router.
///
/// The router works on a *decoded* path: percent-decoding and query-string
/// splitting are the serving layer's job.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    path: String,
    headers: Headers,
    remote_addr: Option<String>,
}

impl Request {
    /// Create a request from a method and a path.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Headers::new(),
            remote_addr: None,
        }
    }

    /// The request method, e.g. `"GET"`.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The decoded request path, e.g. `"/user/gopher"`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Builder-style header insertion.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The peer address (`host:port`) the request arrived from, if known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// Builder-style peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
