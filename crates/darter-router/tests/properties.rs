//! Property-based tests over the router's public surface.

use darter_router::{Router, clean_path};

use darter_core::{Request, StatusCode, method};
use proptest::prelude::*;

/// A clean static route like `/ab/cd`.
fn route_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,5}", 1..4).prop_map(|segments| format!("/{}", segments.join("/")))
}

proptest! {
    #[test]
    fn clean_path_is_idempotent(input in ".*") {
        let once = clean_path(&input).into_owned();
        let twice = clean_path(&once).into_owned();
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.starts_with('/'));
    }

    #[test]
    fn clean_path_preserves_trailing_slash_of_nonroot(input in "[a-z/]{1,12}") {
        let cleaned = clean_path(&input).into_owned();
        if cleaned != "/" {
            let had_content_and_slash = input.ends_with('/')
                && input.trim_matches('/').contains(|c: char| c != '/');
            if had_content_and_slash {
                prop_assert!(cleaned.ends_with('/'), "{:?} -> {:?}", input, cleaned);
            }
        }
    }

    #[test]
    fn registered_static_routes_always_match(routes in prop::collection::vec(route_strategy(), 1..16)) {
        let mut routes = routes;
        routes.sort();
        routes.dedup();

        let mut router = Router::new();
        for route in &routes {
            router.get(route, |_| {}).unwrap();
        }

        for route in &routes {
            let lookup = router.lookup(method::GET, route);
            prop_assert!(lookup.handler.is_some(), "missing {:?}", route);
            prop_assert!(lookup.params.is_none(), "params for static {:?}", route);
        }
    }

    #[test]
    fn toggled_trailing_slash_sets_tsr(routes in prop::collection::vec(route_strategy(), 1..16)) {
        let mut routes = routes;
        routes.sort();
        routes.dedup();

        let mut router = Router::new();
        for route in &routes {
            router.get(route, |_| {}).unwrap();
        }

        for route in &routes {
            let toggled = format!("{route}/");
            if routes.iter().any(|r| r == &toggled) {
                continue;
            }
            let lookup = router.lookup(method::GET, &toggled);
            prop_assert!(lookup.handler.is_none());
            prop_assert!(lookup.tsr, "no tsr for {:?}", toggled);
        }
    }

    #[test]
    fn uppercased_ascii_route_redirects_to_registered_case(route in route_strategy()) {
        let mut router = Router::new();
        router.get(&route, |_| {}).unwrap();

        let shouted = route.to_ascii_uppercase();
        let response = router.dispatch(Request::new(method::GET, shouted));
        prop_assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        prop_assert_eq!(response.header_str("Location"), Some(route.as_str()));
    }

    #[test]
    fn allow_list_is_sorted_and_gated_on_options(mask in 0u8..15) {
        let methods = [method::GET, method::POST, method::PUT, method::DELETE];
        let mut router = Router::new();
        let mut registered = Vec::new();
        for (bit, m) in methods.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                router.handle(m, "/resource", |_| {}).unwrap();
                registered.push(*m);
            }
        }

        let allow = router.allowed("/resource", "");
        if registered.is_empty() {
            prop_assert_eq!(allow, "");
        } else {
            let parts: Vec<&str> = allow.split(", ").collect();
            let mut sorted = parts.clone();
            sorted.sort_unstable();
            prop_assert_eq!(&parts, &sorted, "unsorted: {:?}", &allow);
            prop_assert!(parts.contains(&method::OPTIONS));
            for m in &registered {
                prop_assert!(parts.contains(m), "{} missing from {:?}", m, &allow);
            }
        }
    }

    #[test]
    fn dispatch_never_panics_on_arbitrary_paths(path in ".*") {
        let mut router = Router::new();
        router.get("/user/:name", |_| {}).unwrap();
        router.get("/files/*rest", |_| {}).unwrap();
        router.get("/", |_| {}).unwrap();

        let _ = router.dispatch(Request::new(method::GET, path));
    }
}
