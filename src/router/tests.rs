use super::{RouteTable, Router};
use crate::dispatcher::HandlerRequest;
use crate::naming::HandlerName;
use crate::registrar::{
    EchoProcessor, Exchange, HttpVerb, RegistrationError, RouteBinding, RouteDescriptor,
    RouteHandler, RouteProcessor, ApiContext,
};
use crate::security::AllowAll;
use crate::spec::Definition;
use http::Method;
use std::sync::Arc;

struct Echo(ApiContext);

impl RouteHandler for Echo {
    fn handle(&self, exchange: &mut Exchange, route: &RouteDescriptor) {
        EchoProcessor.process(&self.0, exchange, route);
    }
}

fn binding(verb: HttpVerb, path: &str) -> RouteBinding {
    RouteBinding {
        descriptor: RouteDescriptor {
            verb,
            path: path.to_string(),
            route_path: path.to_string(),
            handler_name: HandlerName::new("test-api", None, verb.as_str(), path),
        },
        gate: Arc::new(AllowAll),
        handler: Arc::new(Echo(ApiContext {
            api_name: "test-api".to_string(),
            version: "v1".to_string(),
            definition: Arc::new(Definition::default()),
        })),
    }
}

#[test]
fn test_root_path() {
    let (re, params) = Router::path_to_regex("/").unwrap();
    assert!(re.is_match("/"));
    assert!(params.is_empty());
}

#[test]
fn test_parameterized_path() {
    let (re, params) = Router::path_to_regex("/items/{id}").unwrap();
    assert!(re.is_match("/items/123"));
    assert!(!re.is_match("/items/123/extra"));
    assert_eq!(params, vec!["id"]);
}

#[test]
fn test_literal_segments_are_escaped() {
    let (re, _) = Router::path_to_regex("/files/report.json").unwrap();
    assert!(re.is_match("/files/report.json"));
    assert!(!re.is_match("/files/reportXjson"));
}

#[test]
fn test_route_prefers_literal_over_template() {
    let mut router = Router::new();
    router.register(binding(HttpVerb::Get, "/users/{id}")).unwrap();
    router.register(binding(HttpVerb::Get, "/users/search")).unwrap();

    let m = router.route(&Method::GET, "/users/search").unwrap();
    assert_eq!(m.binding.descriptor.path, "/users/search");

    let m = router.route(&Method::GET, "/users/a%20b").unwrap();
    assert_eq!(m.binding.descriptor.path, "/users/{id}");
    assert_eq!(m.get_path_param("id"), Some("a b"));
}

#[test]
fn test_route_filters_by_verb() {
    let mut router = Router::new();
    router.register(binding(HttpVerb::Post, "/users")).unwrap();
    assert!(router.route(&Method::GET, "/users").is_none());
    assert!(router.route(&Method::POST, "/users").is_some());
    assert!(router.route(&Method::TRACE, "/users").is_none());
}

#[test]
fn test_duplicate_registration_rejected() {
    let mut router = Router::new();
    router.register(binding(HttpVerb::Get, "/users")).unwrap();
    let err = router.register(binding(HttpVerb::Get, "/users")).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::Duplicate {
            verb: HttpVerb::Get,
            path: "/users".to_string()
        }
    );
    assert_eq!(router.len(), 1);
}

#[test]
fn test_matched_binding_invokes_handler() {
    let mut router = Router::new();
    router.register(binding(HttpVerb::Get, "/users/{id}")).unwrap();
    let m = router.route(&Method::GET, "/users/7").unwrap();
    let mut req = HandlerRequest::new(Method::GET, "/users/7");
    req.path_params = m.path_params.clone();
    let res = m.binding.invoke(req);
    assert_eq!(res.status, 200);
    assert_eq!(res.body["params"]["id"], "7");
}
