//! # Route Registration
//!
//! Compiles a parsed [`Definition`] into route bindings and registers them with
//! a [`RouteTable`]. For every declared resource/method pair one binding is
//! registered at
//!
//! ```text
//! /{api_uri}/{api_name}/{definition version}{route path}
//! ```
//!
//! with a generated handler name (see [`crate::naming`]). Each binding runs
//! the configured [`AuthGate`] first and then the generated handler, which
//! hands the request to the [`RouteProcessor`] and fixes the response content
//! type to the API media type.
//!
//! Registration is all-or-nothing: every descriptor is compiled (and every
//! verb checked) before the first binding is registered, so an unsupported
//! method aborts the whole API version.

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::naming::HandlerName;
use crate::router::RouteTable;
use crate::security::AuthGate;
use crate::spec::Definition;
use http::Method;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// HTTP verbs a specification may bind. Anything else is rejected at
/// registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpVerb {
    /// Lower-case name used for framework dispatch.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Post => "post",
            HttpVerb::Put => "put",
            HttpVerb::Patch => "patch",
            HttpVerb::Delete => "delete",
            HttpVerb::Head => "head",
            HttpVerb::Options => "options",
        }
    }

    #[must_use]
    pub fn method(self) -> Method {
        match self {
            HttpVerb::Get => Method::GET,
            HttpVerb::Post => Method::POST,
            HttpVerb::Put => Method::PUT,
            HttpVerb::Patch => Method::PATCH,
            HttpVerb::Delete => Method::DELETE,
            HttpVerb::Head => Method::HEAD,
            HttpVerb::Options => Method::OPTIONS,
        }
    }

    /// Verb for a request method, if it is one we bind.
    #[must_use]
    pub fn from_method(method: &Method) -> Option<Self> {
        method.as_str().parse().ok()
    }
}

impl FromStr for HttpVerb {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpVerb::Get),
            "post" => Ok(HttpVerb::Post),
            "put" => Ok(HttpVerb::Put),
            "patch" => Ok(HttpVerb::Patch),
            "delete" => Ok(HttpVerb::Delete),
            "head" => Ok(HttpVerb::Head),
            "options" => Ok(HttpVerb::Options),
            _ => Err(RegistrationError::UnsupportedMethod {
                method: s.to_string(),
                path: String::new(),
            }),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration failure. Fatal for the API version being registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The definition declares a verb outside [`HttpVerb`]
    UnsupportedMethod { method: String, path: String },
    /// A route path could not be compiled into a matcher
    MalformedRoute { path: String, reason: String },
    /// The same verb + path was registered twice
    Duplicate { verb: HttpVerb, path: String },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::UnsupportedMethod { method, path } => {
                write!(f, "unsupported HTTP method '{method}' on route '{path}'")
            }
            RegistrationError::MalformedRoute { path, reason } => {
                write!(f, "malformed route '{path}': {reason}")
            }
            RegistrationError::Duplicate { verb, path } => {
                write!(f, "route '{verb} {path}' registered twice")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// One compiled route: what the framework binds and which handler it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub verb: HttpVerb,
    /// Full path template the framework matches, e.g. `/api/test-api/v1/users/{id}`
    pub path: String,
    /// Path template as declared in the definition, e.g. `/users/{id}`
    pub route_path: String,
    pub handler_name: HandlerName,
}

/// The API a route belongs to; handed to processors.
#[derive(Debug, Clone)]
pub struct ApiContext {
    pub api_name: String,
    /// Version segment from the request URI
    pub version: String,
    pub definition: Arc<Definition>,
}

/// Request/response pair owned by the framework for one request.
#[derive(Debug)]
pub struct Exchange {
    pub request: HandlerRequest,
    pub response: HandlerResponse,
}

impl Exchange {
    #[must_use]
    pub fn new(request: HandlerRequest) -> Self {
        Self {
            request,
            response: HandlerResponse::json(200, serde_json::Value::Null),
        }
    }
}

/// Per-route business logic. Writes its result into `exchange.response`.
pub trait RouteProcessor: Send + Sync {
    fn process(&self, api: &ApiContext, exchange: &mut Exchange, route: &RouteDescriptor);
}

/// Processor that echoes the matched route and request parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoProcessor;

impl RouteProcessor for EchoProcessor {
    fn process(&self, api: &ApiContext, exchange: &mut Exchange, route: &RouteDescriptor) {
        let req = &exchange.request;
        exchange.response = HandlerResponse::json(
            200,
            json!({
                "api": api.api_name,
                "version": api.version,
                "handler": route.handler_name.to_string(),
                "method": req.method.to_string(),
                "path": req.path,
                "route": route.path,
                "params": req.path_params,
                "query": req.query_params,
                "body": req.body,
            }),
        );
    }
}

/// Handler invoked once the gate let a request through.
pub trait RouteHandler: Send + Sync {
    fn handle(&self, exchange: &mut Exchange, route: &RouteDescriptor);
}

/// Handler generated for every registered route.
pub struct GeneratedHandler {
    api: Arc<ApiContext>,
    processor: Arc<dyn RouteProcessor>,
    media_type: String,
}

impl RouteHandler for GeneratedHandler {
    fn handle(&self, exchange: &mut Exchange, route: &RouteDescriptor) {
        debug!(
            request_id = %exchange.request.request_id,
            handler = %route.handler_name,
            "Invoking route processor"
        );
        self.processor.process(&self.api, exchange, route);
        exchange
            .response
            .set_header("content-type", self.media_type.clone());
    }
}

/// What a framework stores per route: descriptor, gate and handler.
#[derive(Clone)]
pub struct RouteBinding {
    pub descriptor: RouteDescriptor,
    pub gate: Arc<dyn AuthGate>,
    pub handler: Arc<dyn RouteHandler>,
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl RouteBinding {
    /// Run the gate, then the handler.
    #[must_use]
    pub fn invoke(&self, request: HandlerRequest) -> HandlerResponse {
        if let Err(halt) = self.gate.check(&request, &self.descriptor) {
            info!(
                request_id = %request.request_id,
                handler = %self.descriptor.handler_name,
                status = halt.status,
                "Request halted before handler"
            );
            return halt.into_response();
        }
        let mut exchange = Exchange::new(request);
        self.handler.handle(&mut exchange, &self.descriptor);
        exchange.response
    }
}

/// Compiles definitions into descriptors and registers them.
#[derive(Clone)]
pub struct RouteRegistrar {
    api_uri: String,
    namespace: Option<String>,
    media_type: String,
    gate: Arc<dyn AuthGate>,
    processor: Arc<dyn RouteProcessor>,
}

impl RouteRegistrar {
    pub fn new(
        api_uri: impl Into<String>,
        namespace: Option<String>,
        media_type: impl Into<String>,
        gate: Arc<dyn AuthGate>,
        processor: Arc<dyn RouteProcessor>,
    ) -> Self {
        Self {
            api_uri: api_uri.into(),
            namespace,
            media_type: media_type.into(),
            gate,
            processor,
        }
    }

    /// One descriptor per declared route. Fails on the first unsupported verb.
    ///
    /// `version` is used only when the definition declares none.
    pub fn compile(
        &self,
        definition: &Definition,
        api_name: &str,
        version: &str,
    ) -> Result<Vec<RouteDescriptor>, RegistrationError> {
        let declared = definition.version.as_deref().unwrap_or(version);
        let prefix = format!("/{}/{api_name}/{declared}", self.api_uri);
        definition
            .routes()
            .into_iter()
            .map(|route| {
                let verb = route.verb.parse::<HttpVerb>().map_err(|_| {
                    RegistrationError::UnsupportedMethod {
                        method: route.verb.clone(),
                        path: route.path.clone(),
                    }
                })?;
                Ok(RouteDescriptor {
                    verb,
                    path: format!("{prefix}{}", route.path),
                    handler_name: HandlerName::new(
                        api_name,
                        self.namespace.as_deref(),
                        verb.as_str(),
                        &route.path,
                    ),
                    route_path: route.path,
                })
            })
            .collect()
    }

    /// Register every route of `definition` with `table`.
    ///
    /// Returns the number of registrations. Nothing is registered when
    /// compilation fails; callers should register into a fresh table and
    /// publish it only on success.
    pub fn register_routes<T: RouteTable + ?Sized>(
        &self,
        table: &mut T,
        definition: Arc<Definition>,
        api_name: &str,
        version: &str,
    ) -> Result<usize, RegistrationError> {
        let descriptors = self.compile(&definition, api_name, version)?;
        let api = Arc::new(ApiContext {
            api_name: api_name.to_string(),
            version: version.to_string(),
            definition,
        });
        let handler: Arc<dyn RouteHandler> = Arc::new(GeneratedHandler {
            api,
            processor: Arc::clone(&self.processor),
            media_type: self.media_type.clone(),
        });

        let count = descriptors.len();
        for descriptor in descriptors {
            debug!(
                verb = %descriptor.verb,
                path = %descriptor.path,
                handler = %descriptor.handler_name,
                "Registering route"
            );
            table.register(RouteBinding {
                descriptor,
                gate: Arc::clone(&self.gate),
                handler: Arc::clone(&handler),
            })?;
        }
        info!(api_name, version, routes = count, "Routes registered");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{AllowAll, Halt};
    use crate::spec::build_definition;
    use std::path::Path;

    #[derive(Default)]
    struct Recorder {
        bindings: Vec<RouteBinding>,
    }

    impl RouteTable for Recorder {
        fn register(&mut self, binding: RouteBinding) -> Result<(), RegistrationError> {
            self.bindings.push(binding);
            Ok(())
        }
    }

    struct DenyAll;

    impl AuthGate for DenyAll {
        fn check(&self, _req: &HandlerRequest, _route: &RouteDescriptor) -> Result<(), Halt> {
            Err(Halt::forbidden())
        }
    }

    fn registrar(gate: Arc<dyn AuthGate>) -> RouteRegistrar {
        RouteRegistrar::new(
            "api",
            Some("Handlers".to_string()),
            "application/json",
            gate,
            Arc::new(EchoProcessor),
        )
    }

    fn definition(src: &str) -> Arc<Definition> {
        Arc::new(build_definition(src, Path::new(".")).unwrap())
    }

    #[test]
    fn test_verb_parsing() {
        assert_eq!("GET".parse::<HttpVerb>().unwrap(), HttpVerb::Get);
        assert_eq!("Options".parse::<HttpVerb>().unwrap(), HttpVerb::Options);
        assert!("trace".parse::<HttpVerb>().is_err());
        assert!("connect".parse::<HttpVerb>().is_err());
        assert_eq!(HttpVerb::from_method(&Method::DELETE), Some(HttpVerb::Delete));
        assert_eq!(HttpVerb::from_method(&Method::TRACE), None);
    }

    #[test]
    fn test_register_routes() {
        let def = definition("version: v2\n/search:\n  get:\n/users:\n  POST:\n  /{id}:\n    delete:\n");
        let mut table = Recorder::default();
        let n = registrar(Arc::new(AllowAll))
            .register_routes(&mut table, def, "test-api", "v1")
            .unwrap();
        assert_eq!(n, 3);
        let got: Vec<(String, String, String)> = table
            .bindings
            .iter()
            .map(|b| {
                (
                    b.descriptor.verb.as_str().to_string(),
                    b.descriptor.path.clone(),
                    b.descriptor.handler_name.to_string(),
                )
            })
            .collect();
        assert_eq!(
            got,
            vec![
                ("get".into(), "/api/test-api/v2/search".into(), "Handlers::TestApi::getSearch".into()),
                ("post".into(), "/api/test-api/v2/users".into(), "Handlers::TestApi::postUsers".into()),
                ("delete".into(), "/api/test-api/v2/users/{id}".into(), "Handlers::TestApi::deleteUsers".into()),
            ]
        );
    }

    #[test]
    fn test_missing_definition_version_falls_back_to_uri_version() {
        let def = definition("/search:\n  get:\n");
        let descriptors = registrar(Arc::new(AllowAll))
            .compile(&def, "test-api", "v9")
            .unwrap();
        assert_eq!(descriptors[0].path, "/api/test-api/v9/search");
    }

    #[test]
    fn test_unsupported_method_registers_nothing() {
        let def = definition("version: v1\n/a:\n  get:\n/b:\n  trace:\n");
        let mut table = Recorder::default();
        let err = registrar(Arc::new(AllowAll))
            .register_routes(&mut table, def, "test-api", "v1")
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::UnsupportedMethod {
                method: "trace".into(),
                path: "/b".into()
            }
        );
        assert!(table.bindings.is_empty());
    }

    #[test]
    fn test_binding_sets_content_type_and_runs_processor() {
        let def = definition("version: v1\n/search:\n  get:\n");
        let mut table = Recorder::default();
        registrar(Arc::new(AllowAll))
            .register_routes(&mut table, def, "test-api", "v1")
            .unwrap();
        let res = table.bindings[0].invoke(HandlerRequest::new(Method::GET, "/api/test-api/v1/search"));
        assert_eq!(res.status, 200);
        assert_eq!(res.get_header("Content-Type"), Some("application/json"));
        assert_eq!(res.body["handler"], "Handlers::TestApi::getSearch");
        assert_eq!(res.body["api"], "test-api");
    }

    #[test]
    fn test_gate_halts_before_handler() {
        let def = definition("version: v1\n/search:\n  get:\n");
        let mut table = Recorder::default();
        registrar(Arc::new(DenyAll))
            .register_routes(&mut table, def, "test-api", "v1")
            .unwrap();
        let res = table.bindings[0].invoke(HandlerRequest::new(Method::GET, "/api/test-api/v1/search"));
        assert_eq!(res.status, 403);
        assert!(res.body.get("handler").is_none());
    }
}
