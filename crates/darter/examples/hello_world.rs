//! Hello World Example - Minimal darter router setup
//!
//! This example demonstrates the most basic darter usage:
//! - Registering routes with named and catch-all parameters
//! - Dispatching requests and inspecting the responses
//! - The automatic trailing-slash and fixed-path redirects
//!
//! # Running This Example
//!
//! ```bash
//! cargo run --example hello_world
//! ```

use darter::prelude::*;

fn main() {
    let mut router = Router::new();
    router.set_logger(Logger::new(LogConfig::new().json_output(false)));

    router
        .get("/", |ctx| {
            ctx.json_blob(StatusCode::OK, b"{\"message\":\"Welcome!\"}".to_vec());
        })
        .expect("register /");

    router
        .get("/hello/:name", |ctx| {
            let name = ctx.params().by_name("name").unwrap_or("world").to_string();
            ctx.json_blob(
                StatusCode::OK,
                format!("{{\"hello\":\"{name}\"}}").into_bytes(),
            );
        })
        .expect("register /hello/:name");

    router
        .get("/files/*filepath", |ctx| {
            let filepath = ctx
                .params()
                .by_name("filepath")
                .unwrap_or_default()
                .to_string();
            ctx.json_blob(
                StatusCode::OK,
                format!("{{\"serving\":\"{filepath}\"}}").into_bytes(),
            );
        })
        .expect("register /files/*filepath");

    let requests = [
        ("GET", "/"),
        ("GET", "/hello/gopher"),
        ("GET", "/files/css/site.css"),
        ("GET", "/hello/gopher/"), // trailing slash -> 301
        ("GET", "/../HELLO/gopher"), // fixed-path redirect -> 301
        ("GET", "/missing"),       // -> 404
    ];

    for (method_name, path) in requests {
        let response = router.dispatch(Request::new(method_name, path));
        let location = response
            .header_str("Location")
            .map(|l| format!(" -> {l}"))
            .unwrap_or_default();
        println!(
            "{method_name} {path} => {}{location} {}",
            response.status(),
            response.body_text()
        );
    }
}
