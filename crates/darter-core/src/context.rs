//! Per-request context handed to handlers.
//!
//! A [`Context`] bundles the incoming request, the response under
//! construction, the captured path parameters and the router's logger.
//! The router builds one around every handler invocation and tears it
//! down when the handler returns; handlers must not retain parameter
//! storage past their own return.

use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::error::HttpError;
use crate::logging::Logger;
use crate::params::Params;
use crate::request::Request;
use crate::response::{CONTENT_TYPE_JSON, Response, ResponseBody, StatusCode};

/// The context of the current HTTP request.
pub struct Context<'r> {
    request: Request,
    response: Response,
    params: Params,
    logger: &'r Logger,
    store: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl<'r> Context<'r> {
    /// Create a context around a request.
    #[must_use]
    pub fn new(request: Request, params: Params, logger: &'r Logger) -> Self {
        Self {
            request,
            response: Response::new(),
            params,
            logger,
            store: HashMap::new(),
        }
    }

    /// The incoming request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The captured path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Mutable access to the captured parameters.
    ///
    /// Used by the router to install the capture buffer and to prepend the
    /// matched route path; handlers normally only read.
    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// The router's logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        self.logger
    }

    /// The response under construction.
    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Mutable access to the response under construction.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Tear the context apart, yielding the request, the finished response
    /// and the parameter buffer (for release back to the pool).
    #[must_use]
    pub fn into_parts(self) -> (Request, Response, Params) {
        (self.request, self.response, self.params)
    }

    // ------------------------------------------------------------------
    // Response helpers
    // ------------------------------------------------------------------

    /// Send a JSON response with the given status code.
    pub fn json<T: Serialize>(
        &mut self,
        code: StatusCode,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.write_json_body(code, body);
        Ok(())
    }

    /// Send a pretty-printed JSON response with the given status code.
    pub fn json_pretty<T: Serialize>(
        &mut self,
        code: StatusCode,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec_pretty(value)?;
        self.write_json_body(code, body);
        Ok(())
    }

    /// Send a pre-serialized JSON blob with the given status code.
    pub fn json_blob(&mut self, code: StatusCode, body: Vec<u8>) {
        self.write_json_body(code, body);
    }

    /// Send a response with a status code and no body.
    pub fn no_content(&mut self, code: StatusCode) {
        self.response.set_status(code);
        self.response.set_body(ResponseBody::Empty);
    }

    /// Redirect the request to `location` with a 3xx status code.
    pub fn redirect(&mut self, code: StatusCode, location: &str) {
        debug_assert!(code.is_redirect(), "redirect requires a 3xx status");
        self.response.set_status(code);
        self.response
            .set_header("Location", location.as_bytes().to_vec());
        self.response.set_body(ResponseBody::Empty);
    }

    /// Replace the response with a JSON error body.
    pub fn error(&mut self, code: StatusCode, message: &str) {
        self.response = HttpError::new(code, message).into_response();
    }

    fn write_json_body(&mut self, code: StatusCode, body: Vec<u8>) {
        self.write_content_type(CONTENT_TYPE_JSON);
        self.response.set_status(code);
        self.response.set_body(ResponseBody::Bytes(body));
    }

    /// Set the Content-Type header unless one was already set.
    fn write_content_type(&mut self, value: &str) {
        if self.response.header_value("Content-Type").is_none() {
            self.response
                .append_header("Content-Type", value.as_bytes().to_vec());
        }
    }

    // ------------------------------------------------------------------
    // Request helpers
    // ------------------------------------------------------------------

    /// Best-effort client IP: `X-Forwarded-For` (first hop), then
    /// `X-Real-IP`, then the transport peer address without its port.
    #[must_use]
    pub fn real_ip(&self) -> Option<String> {
        if let Some(forwarded) = self.request.headers().get_str("X-Forwarded-For") {
            let first = forwarded
                .split([',', ' '])
                .find(|part| !part.is_empty())
                .unwrap_or(forwarded);
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
        if let Some(real_ip) = self.request.headers().get_str("X-Real-IP") {
            if !real_ip.is_empty() {
                return Some(real_ip.to_string());
            }
        }
        self.request
            .remote_addr()
            .map(|addr| addr.rsplit_once(':').map_or(addr, |(host, _)| host).to_string())
    }

    // ------------------------------------------------------------------
    // Per-request store
    // ------------------------------------------------------------------

    /// Stash a value in the per-request store, replacing any previous value
    /// of the same type.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.store.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Read a value from the per-request store.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.store
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Remove a value from the per-request store.
    pub fn remove<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.store
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::method;

    fn ctx(logger: &Logger) -> Context<'_> {
        Context::new(Request::new(method::GET, "/"), Params::new(), logger)
    }

    #[test]
    fn json_sets_status_content_type_and_body() {
        let logger = Logger::disabled();
        let mut ctx = ctx(&logger);
        ctx.json(StatusCode::OK, &serde_json::json!({"ok": true}))
            .expect("serializable");

        assert_eq!(ctx.response().status(), StatusCode::OK);
        assert_eq!(
            ctx.response().header_str("Content-Type"),
            Some(CONTENT_TYPE_JSON)
        );
        assert_eq!(ctx.response().body_text(), r#"{"ok":true}"#);
    }

    #[test]
    fn json_respects_existing_content_type() {
        let logger = Logger::disabled();
        let mut ctx = ctx(&logger);
        ctx.response_mut()
            .append_header("Content-Type", b"application/problem+json".to_vec());
        ctx.json_blob(StatusCode::BAD_REQUEST, b"{}".to_vec());

        assert_eq!(
            ctx.response().header_str("Content-Type"),
            Some("application/problem+json")
        );
    }

    #[test]
    fn redirect_sets_location_and_clears_body() {
        let logger = Logger::disabled();
        let mut ctx = ctx(&logger);
        ctx.redirect(StatusCode::MOVED_PERMANENTLY, "/path");

        assert_eq!(ctx.response().status().as_u16(), 301);
        assert_eq!(ctx.response().header_str("Location"), Some("/path"));
        assert!(ctx.response().body_ref().is_empty());
    }

    #[test]
    fn error_writes_json_error_body() {
        let logger = Logger::disabled();
        let mut ctx = ctx(&logger);
        ctx.error(StatusCode::FORBIDDEN, "Forbidden");

        assert_eq!(ctx.response().status(), StatusCode::FORBIDDEN);
        assert_eq!(ctx.response().body_text(), r#"{"error":"Forbidden"}"#);
    }

    #[test]
    fn real_ip_prefers_forwarded_for() {
        let logger = Logger::disabled();
        let request = Request::new(method::GET, "/")
            .with_header("X-Forwarded-For", b"203.0.113.7, 10.0.0.1".to_vec())
            .with_header("X-Real-IP", b"198.51.100.2".to_vec())
            .with_remote_addr("192.0.2.1:4711");
        let ctx = Context::new(request, Params::new(), &logger);

        assert_eq!(ctx.real_ip().as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn real_ip_falls_back_to_remote_addr() {
        let logger = Logger::disabled();
        let request = Request::new(method::GET, "/").with_remote_addr("192.0.2.1:4711");
        let ctx = Context::new(request, Params::new(), &logger);

        assert_eq!(ctx.real_ip().as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn store_round_trips_typed_values() {
        #[derive(Debug, PartialEq)]
        struct UserId(u64);

        let logger = Logger::disabled();
        let mut ctx = ctx(&logger);
        ctx.set(UserId(42));

        assert_eq!(ctx.get::<UserId>(), Some(&UserId(42)));
        assert_eq!(ctx.remove::<UserId>(), Some(UserId(42)));
        assert_eq!(ctx.get::<UserId>(), None);
    }
}
