//! Core types for the darter request router.
//!
//! This crate provides the building blocks shared by the router and by
//! request handlers:
//! - [`Request`] and [`Response`] types
//! - [`Context`] bundling a request, the response under construction,
//!   captured [`Params`] and a [`Logger`]
//! - [`HttpError`] for JSON error bodies
//! - Structured logging ([`LogConfig`], [`Logger`])
//!
//! # Design Principles
//!
//! - No allocation on the matched-route hot path beyond what the caller
//!   already owns
//! - All types are `Send + Sync` where they cross thread boundaries
//! - Response bodies are plain bytes; streaming belongs to a serving layer

#![forbid(unsafe_code)]
// Pedantic clippy lints allowed (style suggestions, not correctness issues)
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::map_unwrap_or)]

mod context;
mod error;
pub mod logging;
mod params;
mod request;
mod response;

pub use context::Context;
pub use error::HttpError;
pub use logging::{LogConfig, LogEntry, LogLevel, Logger};
pub use params::{MATCHED_ROUTE_PATH_KEY, Param, Params};
pub use request::{Headers, Request, method};
pub use response::{CONTENT_TYPE_JSON, Response, ResponseBody, StatusCode};
