//! The router: one trie per HTTP method plus the dispatch policy.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use darter_core::{
    Context, HttpError, LogConfig, Logger, MATCHED_ROUTE_PATH_KEY, Params, Request, Response,
    StatusCode, method,
};
use serde_json::json;

use crate::clean::clean_path;
use crate::error::RouteError;
use crate::pool::ParamsPool;
use crate::trie::{Lookup, Node, count_params};

/// A registered request handler.
///
/// Handlers receive the per-request [`Context`] and write their response
/// into it; captured parameter storage belongs to the router and must not
/// be retained past the handler's return.
pub type Handler = Box<dyn Fn(&mut Context<'_>) + Send + Sync>;

/// Callback receiving the computed `Allow` list, used for automatic
/// `OPTIONS` replies and 405 responses.
pub type AllowCallback = Box<dyn Fn(&mut Context<'_>, &str) + Send + Sync>;

/// Callback invoked when no route matched.
pub type NotFoundCallback = Box<dyn Fn(&mut Context<'_>) + Send + Sync>;

/// Callback receiving a payload recovered from a panicking handler.
pub type PanicCallback = Box<dyn Fn(&mut Context<'_>, Box<dyn Any + Send>) + Send + Sync>;

/// A radix-trie request router.
///
/// Registration takes `&mut self` while dispatch takes `&self`, so the
/// borrow checker enforces the router's concurrency contract: register
/// everything first, then share the router across request-serving threads.
pub struct Router {
    trees: HashMap<String, Node<Handler>>,
    pool: ParamsPool,
    max_params: usize,
    global_allowed: String,
    logger: Logger,

    /// Redirect (301/308) when a route exists for the path with a trailing
    /// slash toggled. Default: enabled.
    pub redirect_trailing_slash: bool,
    /// Redirect (301/308) to the lexically cleaned, case-corrected path
    /// when nothing matched verbatim. Default: enabled.
    pub redirect_fixed_path: bool,
    /// Reply to OPTIONS requests automatically with an `Allow` header.
    /// Path-specific OPTIONS handlers take priority. Default: disabled.
    pub handle_options: bool,
    /// Reply 405 with an `Allow` header when the path is registered under
    /// other methods only. Default: disabled.
    pub handle_method_not_allowed: bool,
    /// Prepend the matched route's pattern to the captured params under
    /// [`MATCHED_ROUTE_PATH_KEY`]. Only affects routes registered while the
    /// flag is set. Default: disabled.
    pub save_matched_route_path: bool,

    /// Overrides the default auto-OPTIONS responder.
    pub options: Option<AllowCallback>,
    /// Overrides the default 405 responder.
    pub method_not_allowed: Option<AllowCallback>,
    /// Overrides the default 404 responder.
    pub not_found: Option<NotFoundCallback>,
    /// When set, handler panics are caught and delegated here; without it
    /// they propagate to the caller.
    pub panic_handler: Option<PanicCallback>,
}

impl Router {
    /// A router with path auto-correction (trailing slashes and fixed-path
    /// redirects) enabled, everything else off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            pool: ParamsPool::new(),
            max_params: 0,
            global_allowed: String::new(),
            logger: Logger::new(LogConfig::default()),
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_options: false,
            handle_method_not_allowed: false,
            save_matched_route_path: false,
            options: None,
            method_not_allowed: None,
            not_found: None,
            panic_handler: None,
        }
    }

    /// Install a logger; the router emits one entry per dispatched request.
    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a handler for the given method and pattern.
    ///
    /// Intended for bulk loading and for non-standard or custom methods;
    /// the [`Router::get`]-style shortcuts cover the common ones.
    pub fn handle<H>(&mut self, method_name: &str, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        if method_name.is_empty() {
            return Err(RouteError::EmptyMethod);
        }
        if path.is_empty() {
            return Err(RouteError::EmptyPath);
        }
        if !path.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash { path: path.into() });
        }
        check_duplicate_param_names(path)?;

        let mut extra_slots = 0;
        let handler: Handler = if self.save_matched_route_path {
            extra_slots = 1;
            let pattern = path.to_string();
            Box::new(move |ctx: &mut Context<'_>| {
                ctx.params_mut().insert_front(MATCHED_ROUTE_PATH_KEY, &pattern);
                handler(ctx);
            })
        } else {
            Box::new(handler)
        };

        let root = self.trees.entry(method_name.to_string()).or_default();
        root.add_route(path, handler)?;

        let params = count_params(path) + extra_slots;
        if params > self.max_params {
            self.max_params = params;
        }

        // The server-wide Allow list is refreshed on every registration.
        self.global_allowed = self.allowed("*", "");
        Ok(())
    }

    /// Shortcut for [`Router::handle`] with the GET method.
    pub fn get<H>(&mut self, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.handle(method::GET, path, handler)
    }

    /// Shortcut for [`Router::handle`] with the HEAD method.
    pub fn head<H>(&mut self, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.handle(method::HEAD, path, handler)
    }

    /// Shortcut for [`Router::handle`] with the OPTIONS method.
    pub fn options<H>(&mut self, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.handle(method::OPTIONS, path, handler)
    }

    /// Shortcut for [`Router::handle`] with the POST method.
    pub fn post<H>(&mut self, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.handle(method::POST, path, handler)
    }

    /// Shortcut for [`Router::handle`] with the PUT method.
    pub fn put<H>(&mut self, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.handle(method::PUT, path, handler)
    }

    /// Shortcut for [`Router::handle`] with the PATCH method.
    pub fn patch<H>(&mut self, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.handle(method::PATCH, path, handler)
    }

    /// Shortcut for [`Router::handle`] with the DELETE method.
    pub fn delete<H>(&mut self, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.handle(method::DELETE, path, handler)
    }

    /// Serve files below `root` under a pattern ending in `/*filepath`.
    ///
    /// Missing files answer with a plain 404, not the router's `not_found`
    /// callback. Path traversal (`..` segments) is rejected outright.
    pub fn serve_files(&mut self, path: &str, root: impl Into<PathBuf>) -> Result<(), RouteError> {
        if !path.ends_with("/*filepath") {
            return Err(RouteError::bad_pattern(path, "path must end with /*filepath"));
        }
        let root = root.into();
        self.get(path, move |ctx: &mut Context<'_>| {
            let rel = ctx
                .params()
                .by_name("filepath")
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string();
            serve_file(ctx, &root, &rel);
        })
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Manual lookup of a method + path combination, e.g. to build a
    /// framework around the router.
    ///
    /// On a match the handler and any captured parameters are returned; on
    /// a miss the `tsr` flag reports whether a route exists for the path
    /// with a toggled trailing slash.
    #[must_use]
    pub fn lookup(&self, method_name: &str, path: &str) -> Lookup<'_, Handler> {
        let Some(root) = self.trees.get(method_name) else {
            return Lookup {
                handler: None,
                params: None,
                tsr: false,
            };
        };

        let acquire = || self.pool.acquire(self.max_params.max(1));
        let mut lookup = root.get_value(path, Some(&acquire));
        if lookup.handler.is_none() {
            if let Some(params) = lookup.params.take() {
                self.pool.release(params);
            }
        }
        lookup
    }

    /// Comma-separated, ASCII-sorted `Allow` list for a path.
    ///
    /// `"*"` asks for the server-wide list; `req_method` is excluded from
    /// the probe. OPTIONS is included iff any other method matches. An
    /// empty string means no method matches at all.
    #[must_use]
    pub fn allowed(&self, path: &str, req_method: &str) -> String {
        let mut allowed: Vec<&str> = Vec::with_capacity(9);

        if path == "*" {
            // Server-wide. The empty method is used internally to refresh
            // the cache; any other caller gets the cached list.
            if req_method.is_empty() {
                for m in self.trees.keys() {
                    if m.as_str() == method::OPTIONS {
                        continue;
                    }
                    allowed.push(m);
                }
            } else {
                return self.global_allowed.clone();
            }
        } else {
            for (m, tree) in &self.trees {
                if m.as_str() == req_method || m.as_str() == method::OPTIONS {
                    continue;
                }
                // Probe without param capture.
                if tree.get_value(path, None).handler.is_some() {
                    allowed.push(m);
                }
            }
        }

        if allowed.is_empty() {
            return String::new();
        }
        allowed.push(method::OPTIONS);
        allowed.sort_unstable();
        allowed.join(", ")
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Route a request to its handler and produce the response.
    ///
    /// Misses never surface as errors: they turn into a redirect, an
    /// auto-OPTIONS reply, a 405 or a 404 according to the configuration.
    #[must_use]
    pub fn dispatch(&self, request: Request) -> Response {
        let method_name = request.method().to_string();
        let path = request.path().to_string();

        let mut ctx = Context::new(request, Params::new(), &self.logger);
        self.dispatch_to(&mut ctx, &method_name, &path);

        let status = ctx.response().status();
        self.logger.info(
            "darter::router",
            "request served",
            &[
                ("method", json!(method_name)),
                ("path", json!(path)),
                ("status", json!(status.as_u16())),
            ],
        );

        let (_, response, params) = ctx.into_parts();
        if params.capacity() > 0 {
            self.pool.release(params);
        }
        response
    }

    fn dispatch_to(&self, ctx: &mut Context<'_>, method_name: &str, path: &str) {
        if let Some(root) = self.trees.get(method_name) {
            let acquire = || self.pool.acquire(self.max_params.max(1));
            let lookup = root.get_value(path, Some(&acquire));

            if let Some(handler) = lookup.handler {
                if let Some(params) = lookup.params {
                    *ctx.params_mut() = params;
                }
                self.invoke(handler, ctx);
                return;
            }
            if let Some(params) = lookup.params {
                self.pool.release(params);
            }

            // Try to fix the path, unless CONNECT or the root path.
            if method_name != method::CONNECT && path != "/" {
                let code = if method_name == method::GET {
                    StatusCode::MOVED_PERMANENTLY
                } else {
                    // Preserves method and body.
                    StatusCode::PERMANENT_REDIRECT
                };

                if lookup.tsr && self.redirect_trailing_slash {
                    let target = if path.len() > 1 && path.ends_with('/') {
                        path[..path.len() - 1].to_string()
                    } else {
                        format!("{path}/")
                    };
                    ctx.redirect(code, &target);
                    return;
                }

                if self.redirect_fixed_path {
                    let cleaned = clean_path(path);
                    if let Some(fixed) =
                        root.find_case_insensitive(&cleaned, self.redirect_trailing_slash)
                    {
                        ctx.redirect(code, &fixed);
                        return;
                    }
                }
            }
        }

        if method_name == method::OPTIONS && self.handle_options {
            let allow = self.allowed(path, method::OPTIONS);
            if !allow.is_empty() {
                match &self.options {
                    Some(callback) => callback(ctx, &allow),
                    None => default_options(ctx, &allow),
                }
                return;
            }
        } else if self.handle_method_not_allowed {
            let allow = self.allowed(path, method_name);
            if !allow.is_empty() {
                match &self.method_not_allowed {
                    Some(callback) => callback(ctx, &allow),
                    None => default_method_not_allowed(ctx, &allow),
                }
                return;
            }
        }

        match &self.not_found {
            Some(callback) => callback(ctx),
            None => default_not_found(ctx),
        }
    }

    fn invoke(&self, handler: &Handler, ctx: &mut Context<'_>) {
        match &self.panic_handler {
            Some(panic_handler) => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| handler(ctx)));
                if let Err(payload) = result {
                    panic_handler(ctx, payload);
                }
            }
            None => handler(ctx),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn check_duplicate_param_names(path: &str) -> Result<(), RouteError> {
    let mut names: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        let Some(first) = segment.bytes().next() else {
            continue;
        };
        if first != b':' && first != b'*' {
            continue;
        }
        let name = &segment[1..];
        if name.is_empty() {
            continue; // rejected later by the trie
        }
        if names.contains(&name) {
            return Err(RouteError::bad_pattern(
                path,
                format!("duplicate parameter name '{name}'"),
            ));
        }
        names.push(name);
    }
    Ok(())
}

fn default_not_found(ctx: &mut Context<'_>) {
    *ctx.response_mut() = HttpError::from_status(StatusCode::NOT_FOUND).into_response();
}

fn default_method_not_allowed(ctx: &mut Context<'_>, allow: &str) {
    let mut response = HttpError::from_status(StatusCode::METHOD_NOT_ALLOWED).into_response();
    response.set_header("Allow", allow.as_bytes().to_vec());
    *ctx.response_mut() = response;
}

fn default_options(ctx: &mut Context<'_>, allow: &str) {
    // An OPTIONS request without Access-Control-Request-Method is not a
    // CORS preflight; a bare 204 suffices then.
    let preflight = ctx
        .request()
        .headers()
        .get("Access-Control-Request-Method")
        .is_some_and(|v| !v.is_empty());
    if preflight {
        ctx.response_mut()
            .set_header("Access-Control-Allow-Methods", allow.as_bytes().to_vec());
        ctx.response_mut()
            .set_header("Access-Control-Allow-Origin", "*".as_bytes().to_vec());
    }
    ctx.response_mut().set_header("Allow", allow.as_bytes().to_vec());
    ctx.no_content(StatusCode::NO_CONTENT);
}

fn serve_file(ctx: &mut Context<'_>, root: &Path, rel: &str) {
    // Reject traversal before touching the filesystem.
    if rel.split('/').any(|segment| segment == "..") {
        ctx.error(StatusCode::FORBIDDEN, "Forbidden");
        return;
    }

    let full = root.join(rel);
    match std::fs::read(&full) {
        Ok(bytes) => {
            let mime = full
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or("application/octet-stream", mime_type_for_extension);
            ctx.response_mut()
                .set_header("Content-Type", mime.as_bytes().to_vec());
            ctx.response_mut().set_status(StatusCode::OK);
            ctx.response_mut()
                .set_body(darter_core::ResponseBody::Bytes(bytes));
        }
        Err(_) => ctx.error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Content-Type guess from a file extension.
fn mime_type_for_extension(ext: &str) -> &'static str {
    match ext {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darter_core::ResponseBody;

    fn noop(_ctx: &mut Context<'_>) {}

    #[test]
    fn registration_validates_inputs() {
        let mut router = Router::new();
        assert_eq!(router.handle("", "/x", noop), Err(RouteError::EmptyMethod));
        assert_eq!(router.handle(method::GET, "", noop), Err(RouteError::EmptyPath));
        assert!(matches!(
            router.handle(method::GET, "x", noop),
            Err(RouteError::MissingLeadingSlash { .. })
        ));
        assert!(matches!(
            router.handle(method::GET, "/user/:id/posts/:id", noop),
            Err(RouteError::BadPattern { .. })
        ));
    }

    #[test]
    fn conflicting_registration_reports_conflict() {
        let mut router = Router::new();
        router.get("/a/:x", noop).unwrap();
        let err = router.get("/a/:y", noop).unwrap_err();
        assert!(err.is_conflict(), "{err}");
    }

    #[test]
    fn lookup_returns_handler_and_params() {
        let mut router = Router::new();
        router.get("/user/:name", noop).unwrap();

        let lookup = router.lookup(method::GET, "/user/gopher");
        assert!(lookup.handler.is_some());
        let params = lookup.params.expect("params captured");
        assert_eq!(params.by_name("name"), Some("gopher"));
        assert!(!lookup.tsr);
    }

    #[test]
    fn lookup_miss_reports_tsr() {
        let mut router = Router::new();
        router.get("/path/", noop).unwrap();

        let lookup = router.lookup(method::GET, "/path");
        assert!(lookup.handler.is_none());
        assert!(lookup.params.is_none());
        assert!(lookup.tsr);

        let lookup = router.lookup(method::POST, "/path");
        assert!(!lookup.tsr, "no tree for POST");
    }

    #[test]
    fn allowed_is_sorted_and_includes_options() {
        let mut router = Router::new();
        router.post("/path", noop).unwrap();
        router.get("/path", noop).unwrap();
        router.delete("/path", noop).unwrap();

        assert_eq!(router.allowed("/path", method::PUT), "DELETE, GET, OPTIONS, POST");
        assert_eq!(router.allowed("/path", method::GET), "DELETE, OPTIONS, POST");
        assert_eq!(router.allowed("/missing", method::GET), "");
    }

    #[test]
    fn allowed_global_list_is_cached() {
        let mut router = Router::new();
        router.get("/a", noop).unwrap();
        router.post("/b", noop).unwrap();

        assert_eq!(router.allowed("*", method::OPTIONS), "GET, OPTIONS, POST");

        router.delete("/c", noop).unwrap();
        assert_eq!(
            router.allowed("*", method::OPTIONS),
            "DELETE, GET, OPTIONS, POST",
            "cache refreshed on registration"
        );
    }

    #[test]
    fn custom_methods_are_supported() {
        let mut router = Router::new();
        router
            .handle("PROPFIND", "/dav/:res", |ctx| {
                ctx.no_content(StatusCode::NO_CONTENT);
            })
            .unwrap();

        let response = router.dispatch(Request::new("PROPFIND", "/dav/box"));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn save_matched_route_path_prepends_pattern() {
        let mut router = Router::new();
        router.save_matched_route_path = true;
        router
            .get("/user/:name", |ctx| {
                let pattern = ctx
                    .params()
                    .matched_route_path()
                    .unwrap_or_default()
                    .to_string();
                let name = ctx.params().by_name("name").unwrap_or_default().to_string();
                ctx.response_mut().set_body(ResponseBody::Bytes(
                    format!("{pattern}|{name}").into_bytes(),
                ));
            })
            .unwrap();

        let response = router.dispatch(Request::new(method::GET, "/user/gopher"));
        assert_eq!(response.body_text(), "/user/:name|gopher");
    }

    #[test]
    fn panic_handler_catches_handler_panics() {
        let mut router = Router::new();
        router.panic_handler = Some(Box::new(|ctx, payload| {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("unknown panic");
            ctx.error(StatusCode::INTERNAL_SERVER_ERROR, message);
        }));
        router
            .get("/boom", |_ctx| panic!("handler exploded"))
            .unwrap();

        let response = router.dispatch(Request::new(method::GET, "/boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body_text().contains("handler exploded"));
    }

    #[test]
    fn serve_files_requires_catch_all_suffix() {
        let mut router = Router::new();
        assert!(router.serve_files("/static/:file", "/tmp").is_err());
        assert!(router.serve_files("/static/*filepath", "/tmp").is_ok());
    }

    #[test]
    fn serve_files_serves_and_guards() {
        let dir = std::env::temp_dir().join("darter-serve-files-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("hello.txt"), b"hello files").unwrap();

        let mut router = Router::new();
        router.serve_files("/static/*filepath", dir.clone()).unwrap();

        let ok = router.dispatch(Request::new(method::GET, "/static/hello.txt"));
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(ok.body_text(), "hello files");
        assert_eq!(ok.header_str("Content-Type"), Some("text/plain; charset=utf-8"));

        let missing = router.dispatch(Request::new(method::GET, "/static/nope.txt"));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        // The catch-all matches the raw path, so the ".." guard in the
        // file handler must refuse it.
        let traversal = router.dispatch(Request::new(method::GET, "/static/../secrets"));
        assert_eq!(traversal.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn mime_types_cover_common_extensions() {
        assert_eq!(mime_type_for_extension("html"), "text/html; charset=utf-8");
        assert_eq!(mime_type_for_extension("png"), "image/png");
        assert_eq!(mime_type_for_extension("bin"), "application/octet-stream");
    }
}
