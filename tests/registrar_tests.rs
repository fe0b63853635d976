//! Route registration from a parsed definition into a live router.

use http::Method;
use specroute::registrar::{EchoProcessor, HttpVerb, RegistrationError, RouteRegistrar};
use specroute::router::Router;
use specroute::security::AllowAll;
use specroute::spec::{build_definition, Definition};
use std::path::Path;
use std::sync::Arc;

mod common;
use common::spec_tree::{INDEX_RAML, INDEX_ROUTES};

fn registrar() -> RouteRegistrar {
    RouteRegistrar::new(
        "api",
        Some("Handlers".to_string()),
        "application/json",
        Arc::new(AllowAll),
        Arc::new(EchoProcessor),
    )
}

fn definition(src: &str) -> Arc<Definition> {
    Arc::new(build_definition(src, Path::new(".")).unwrap())
}

#[test]
fn test_every_route_is_registered_once() {
    let mut router = Router::new();
    let n = registrar()
        .register_routes(&mut router, definition(INDEX_RAML), "test-api", "v1")
        .unwrap();
    assert_eq!(n, INDEX_ROUTES);
    assert_eq!(router.len(), INDEX_ROUTES);

    let mut got: Vec<(String, String, String)> = router
        .descriptors()
        .map(|d| (d.verb.to_string(), d.path.clone(), d.handler_name.to_string()))
        .collect();
    got.sort();
    let mut want: Vec<(String, String, String)> = [
        ("delete", "/api/test-api/v1/users/{id}", "Handlers::TestApi::deleteUsers"),
        ("get", "/api/test-api/v1/search", "Handlers::TestApi::getSearch"),
        ("get", "/api/test-api/v1/users", "Handlers::TestApi::getUsers"),
        ("get", "/api/test-api/v1/users/{id}", "Handlers::TestApi::getUsers"),
        ("post", "/api/test-api/v1/users", "Handlers::TestApi::postUsers"),
    ]
    .iter()
    .map(|(v, p, h)| (v.to_string(), p.to_string(), h.to_string()))
    .collect();
    want.sort();
    assert_eq!(got, want);
}

#[test]
fn test_verbs_are_lower_case() {
    let def = definition("version: v1\n/a:\n  GET:\n  Put:\n");
    let descriptors = registrar().compile(&def, "test-api", "v1").unwrap();
    let verbs: Vec<&str> = descriptors.iter().map(|d| d.verb.as_str()).collect();
    assert_eq!(verbs, ["get", "put"]);
    assert_eq!(descriptors[1].verb, HttpVerb::Put);
}

#[test]
fn test_registered_routes_are_reachable() {
    let mut router = Router::new();
    registrar()
        .register_routes(&mut router, definition(INDEX_RAML), "test-api", "v1")
        .unwrap();

    let m = router.route(&Method::GET, "/api/test-api/v1/users/42").unwrap();
    assert_eq!(m.binding.descriptor.route_path, "/users/{id}");
    assert_eq!(m.path_params.get("id").map(String::as_str), Some("42"));

    let m = router.route(&Method::GET, "/api/test-api/v1/users").unwrap();
    assert_eq!(m.binding.descriptor.route_path, "/users");
    assert!(router.route(&Method::PUT, "/api/test-api/v1/users").is_none());
    assert!(router.route(&Method::GET, "/api/test-api/v2/users").is_none());
}

#[test]
fn test_unsupported_verb_registers_nothing() {
    let mut router = Router::new();
    let def = definition("version: v1\n/a:\n  get:\n  post:\n/b:\n  connect:\n");
    let err = registrar()
        .register_routes(&mut router, def, "test-api", "v1")
        .unwrap_err();
    assert!(matches!(err, RegistrationError::UnsupportedMethod { ref method, .. } if method == "connect"));
    assert!(router.is_empty());
}

#[test]
fn test_registering_twice_is_a_duplicate() {
    let mut router = Router::new();
    let def = definition(INDEX_RAML);
    registrar()
        .register_routes(&mut router, Arc::clone(&def), "test-api", "v1")
        .unwrap();
    let err = registrar()
        .register_routes(&mut router, def, "test-api", "v1")
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Duplicate { .. }));
}

#[test]
fn test_without_namespace_class_is_bare() {
    let registrar = RouteRegistrar::new(
        "v",
        None,
        "application/json",
        Arc::new(AllowAll),
        Arc::new(EchoProcessor),
    );
    let descriptors = registrar
        .compile(&definition("version: v3\n/user-groups:\n  patch:\n"), "people_api", "v1")
        .unwrap();
    assert_eq!(descriptors[0].path, "/v/people_api/v3/user-groups");
    assert_eq!(descriptors[0].handler_name.to_string(), "PeopleApi::patchUserGroups");
}
