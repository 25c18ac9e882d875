//! Trie-based HTTP request router.
//!
//! This crate dispatches an incoming request, identified by (method, path),
//! to a previously registered handler, extracting named (`:name`) and
//! catch-all (`*name`) path parameters along the way. Routes are indexed in
//! one compressed radix trie per HTTP method.
//!
//! # Features
//!
//! - Only explicit matches: a request matches exactly one route or none
//! - Trailing-slash redirects (`/foo/` -> `/foo`) at no extra lookup cost
//! - Path auto-correction: lexical cleaning (`..`, `//`) plus
//!   case-insensitive reconstruction of the registered pattern
//! - Automatic `OPTIONS` and `405 Method Not Allowed` replies with a
//!   computed `Allow` header
//! - Reusable parameter buffers so matching never allocates on the happy
//!   path
//!
//! # Example
//!
//! ```
//! use darter_core::{Request, StatusCode, method};
//! use darter_router::Router;
//!
//! let mut router = Router::new();
//! router
//!     .get("/hello/:name", |ctx| {
//!         let name = ctx.params().by_name("name").unwrap_or("world").to_string();
//!         ctx.json_blob(StatusCode::OK, format!("{{\"hello\":\"{name}\"}}").into_bytes());
//!     })
//!     .unwrap();
//!
//! let response = router.dispatch(Request::new(method::GET, "/hello/gopher"));
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

#![forbid(unsafe_code)]
// Pedantic clippy lints allowed (style suggestions, not correctness issues)
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]

mod clean;
mod error;
mod pool;
mod router;
mod trie;

pub use clean::clean_path;
pub use error::RouteError;
pub use router::{AllowCallback, Handler, NotFoundCallback, PanicCallback, Router};
pub use trie::Lookup;
