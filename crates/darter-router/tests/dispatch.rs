//! End-to-end dispatch tests: handler invocation, redirects, automatic
//! OPTIONS replies, 405 handling and the not-found fallback.

use darter_core::{Request, ResponseBody, StatusCode, method};
use darter_router::Router;

#[test]
fn named_parameter_reaches_handler() {
    let mut router = Router::new();
    router
        .get("/user/:name", |ctx| {
            let name = ctx.params().by_name("name").unwrap_or_default().to_string();
            ctx.response_mut()
                .set_body(ResponseBody::Bytes(name.into_bytes()));
        })
        .unwrap();

    let response = router.dispatch(Request::new(method::GET, "/user/gopher"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), "gopher");
}

#[test]
fn catch_all_captures_suffix_with_leading_slash() {
    let mut router = Router::new();
    router
        .get("/files/*filepath", |ctx| {
            let filepath = ctx
                .params()
                .by_name("filepath")
                .unwrap_or_default()
                .to_string();
            ctx.response_mut()
                .set_body(ResponseBody::Bytes(filepath.into_bytes()));
        })
        .unwrap();

    let response = router.dispatch(Request::new(method::GET, "/files/a/b.txt"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), "/a/b.txt");
}

#[test]
fn trailing_slash_redirects_get_with_301() {
    let mut router = Router::new();
    router.get("/path", |_| {}).unwrap();
    router.get("/dir/", |_| {}).unwrap();
    router.get("/", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::GET, "/path/"));
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header_str("Location"), Some("/path"));

    let response = router.dispatch(Request::new(method::GET, "/dir"));
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header_str("Location"), Some("/dir/"));
}

#[test]
fn trailing_slash_redirects_non_get_with_308() {
    let mut router = Router::new();
    router.patch("/path", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::PATCH, "/path/"));
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.header_str("Location"), Some("/path"));
}

#[test]
fn fixed_path_redirect_cleans_and_folds_case() {
    let mut router = Router::new();
    router.get("/path", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::GET, "/../PATH"));
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header_str("Location"), Some("/path"));
}

#[test]
fn disabled_redirects_fall_through_to_not_found() {
    let mut router = Router::new();
    router.redirect_trailing_slash = false;
    router.redirect_fixed_path = false;
    router.get("/path", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::GET, "/path/"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body_text(), r#"{"error":"Not Found"}"#);
}

#[test]
fn connect_and_root_are_never_redirected() {
    let mut router = Router::new();
    router.handle(method::CONNECT, "/path", |_| {}).unwrap();
    router.get("/dir/", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::CONNECT, "/path/"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router.dispatch(Request::new(method::GET, "/"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn method_not_allowed_lists_alternatives() {
    let mut router = Router::new();
    router.handle_method_not_allowed = true;
    router.post("/path", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::GET, "/path"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header_str("Allow"), Some("OPTIONS, POST"));
    assert_eq!(response.body_text(), r#"{"error":"Method Not Allowed"}"#);
}

#[test]
fn method_not_allowed_callback_overrides_default() {
    let mut router = Router::new();
    router.handle_method_not_allowed = true;
    router.method_not_allowed = Some(Box::new(|ctx, allow| {
        ctx.response_mut()
            .set_header("Allow", allow.as_bytes().to_vec());
        ctx.no_content(StatusCode::METHOD_NOT_ALLOWED);
    }));
    router.post("/path", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::GET, "/path"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header_str("Allow"), Some("OPTIONS, POST"));
    assert!(response.body_ref().is_empty());
}

#[test]
fn server_wide_options_reply() {
    let mut router = Router::new();
    router.handle_options = true;
    router.post("/path", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::OPTIONS, "*"));
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.header_str("Allow"), Some("OPTIONS, POST"));
}

#[test]
fn path_options_reply_and_preflight_headers() {
    let mut router = Router::new();
    router.handle_options = true;
    router.post("/path", |_| {}).unwrap();
    router.put("/path", |_| {}).unwrap();

    let plain = router.dispatch(Request::new(method::OPTIONS, "/path"));
    assert_eq!(plain.status(), StatusCode::NO_CONTENT);
    assert_eq!(plain.header_str("Allow"), Some("OPTIONS, POST, PUT"));
    assert_eq!(plain.header_str("Access-Control-Allow-Methods"), None);

    let preflight = router.dispatch(
        Request::new(method::OPTIONS, "/path")
            .with_header("Access-Control-Request-Method", b"POST".to_vec()),
    );
    assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        preflight.header_str("Access-Control-Allow-Methods"),
        Some("OPTIONS, POST, PUT")
    );
    assert_eq!(preflight.header_str("Access-Control-Allow-Origin"), Some("*"));
}

#[test]
fn registered_options_handler_wins_over_auto_reply() {
    let mut router = Router::new();
    router.handle_options = true;
    router.post("/path", |_| {}).unwrap();
    router
        .options("/path", |ctx| {
            ctx.response_mut()
                .set_body(ResponseBody::Bytes(b"custom".to_vec()));
        })
        .unwrap();

    let response = router.dispatch(Request::new(method::OPTIONS, "/path"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), "custom");
}

#[test]
fn options_without_matches_falls_to_not_found() {
    let mut router = Router::new();
    router.handle_options = true;
    router.post("/path", |_| {}).unwrap();

    let response = router.dispatch(Request::new(method::OPTIONS, "/missing"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn conflicting_wildcard_names_fail_registration() {
    let mut router = Router::new();
    router.get("/a/:x", |_| {}).unwrap();
    let err = router.get("/a/:y", |_| {}).unwrap_err();
    assert!(err.is_conflict(), "{err}");
    assert!(err.to_string().contains(":x"), "{err}");
}

#[test]
fn not_found_callback_overrides_default() {
    let mut router = Router::new();
    router.not_found = Some(Box::new(|ctx| {
        ctx.error(StatusCode::NOT_FOUND, "nothing here");
    }));

    let response = router.dispatch(Request::new(method::GET, "/missing"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body_text(), r#"{"error":"nothing here"}"#);
}

#[test]
fn default_not_found_is_json() {
    let router = Router::new();
    let response = router.dispatch(Request::new(method::GET, "/missing"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.header_str("Content-Type"),
        Some("application/json; charset=UTF-8")
    );
    assert_eq!(response.body_text(), r#"{"error":"Not Found"}"#);
}

#[test]
fn handlers_can_use_the_context_store_and_logger() {
    struct Traced(&'static str);

    let mut router = Router::new();
    router
        .get("/traced", |ctx| {
            ctx.set(Traced("marker"));
            let message = ctx.get::<Traced>().map(|t| t.0).unwrap_or_default();
            assert!(!ctx.logger().enabled(darter_core::LogLevel::Trace));
            ctx.response_mut()
                .set_body(ResponseBody::Bytes(message.as_bytes().to_vec()));
        })
        .unwrap();

    let response = router.dispatch(Request::new(method::GET, "/traced"));
    assert_eq!(response.body_text(), "marker");
}
