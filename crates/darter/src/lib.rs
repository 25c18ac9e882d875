//! High performance trie-based HTTP request router.
//!
//! darter dispatches requests by (method, path) over one compressed radix
//! trie per method, with named (`:name`) and catch-all (`*name`) path
//! parameters, trailing-slash redirects and case-insensitive path
//! auto-correction.
//!
//! # Quick Start
//!
//! ```
//! use darter::prelude::*;
//!
//! let mut router = Router::new();
//! router
//!     .get("/hello/:name", |ctx| {
//!         let name = ctx.params().by_name("name").unwrap_or("world").to_string();
//!         ctx.json_blob(
//!             StatusCode::OK,
//!             format!("{{\"hello\":\"{name}\"}}").into_bytes(),
//!         );
//!     })
//!     .unwrap();
//!
//! let response = router.dispatch(Request::new(method::GET, "/hello/gopher"));
//! assert_eq!(response.status(), StatusCode::OK);
//! ```
//!
//! # Crate Structure
//!
//! - [`darter_core`] - request/response/context types, params, logging
//! - [`darter_router`] - the radix trie, path cleaning and dispatch policy

#![forbid(unsafe_code)]

// Re-export crates
pub use darter_core as core;
pub use darter_router as router;

// Re-export commonly used types
pub use darter_core::{
    Context, Headers, HttpError, LogConfig, LogEntry, LogLevel, Logger, MATCHED_ROUTE_PATH_KEY,
    Param, Params, Request, Response, ResponseBody, StatusCode, method,
};
pub use darter_router::{
    AllowCallback, Handler, Lookup, NotFoundCallback, PanicCallback, RouteError, Router, clean_path,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Context, Headers, LogConfig, LogLevel, Logger, Param, Params, Request, Response,
        ResponseBody, RouteError, Router, StatusCode, clean_path, method,
    };
}
