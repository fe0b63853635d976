use super::core::{HandlerRequest, HandlerResponse, IncomingRequest};
use crate::cache::{CacheService, DefinitionCache, LoadError, MemoryCache};
use crate::classify::{classify_with_prefixes, Classification};
use crate::config::{ConfigError, RouterConfig};
use crate::docs::{is_plain_segment, DocError, DocumentResponse, SpecDocServer};
use crate::registrar::{EchoProcessor, RegistrationError, RouteDescriptor, RouteProcessor, RouteRegistrar};
use crate::router::Router;
use crate::security::{AllowAll, AuthGate};
use crate::spec::{parser_for, Definition, DefinitionParser};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What the pre-router decided for one request.
#[derive(Debug)]
pub enum Dispatch {
    /// Handled by a generated API route (or the API's not-found)
    Api(HandlerResponse),
    /// A specification document
    Document(DocumentResponse),
    /// Not ours; hand the request to the next router
    FallThrough,
}

/// Request-level dispatch failure.
#[derive(Debug)]
pub enum DispatchError {
    Config(ConfigError),
    Definition(LoadError),
    Registration(RegistrationError),
    Document(DocError),
}

impl DispatchError {
    /// HTTP status to report to the client.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::Definition(e) if e.is_not_found() => 404,
            DispatchError::Document(DocError::NotFound { .. }) => 404,
            _ => 500,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Config(e) => write!(f, "configuration error: {e}"),
            DispatchError::Definition(e) => write!(f, "definition error: {e}"),
            DispatchError::Registration(e) => write!(f, "registration error: {e}"),
            DispatchError::Document(e) => write!(f, "document error: {e}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Config(e) => Some(e),
            DispatchError::Definition(e) => Some(e),
            DispatchError::Registration(e) => Some(e),
            DispatchError::Document(e) => Some(e),
        }
    }
}

impl From<ConfigError> for DispatchError {
    fn from(e: ConfigError) -> Self {
        DispatchError::Config(e)
    }
}

impl From<LoadError> for DispatchError {
    fn from(e: LoadError) -> Self {
        DispatchError::Definition(e)
    }
}

impl From<RegistrationError> for DispatchError {
    fn from(e: RegistrationError) -> Self {
        DispatchError::Registration(e)
    }
}

impl From<DocError> for DispatchError {
    fn from(e: DocError) -> Self {
        DispatchError::Document(e)
    }
}

type ApiKey = (String, String);

/// Route table published for one API version.
struct ApiRoutes {
    definition: Arc<Definition>,
    router: Router,
}

/// Builder for [`Dispatcher`].
///
/// Defaults: the parser matching `spec_format`, an in-memory cache sized by
/// `cache_capacity` when `cache` is on, [`AllowAll`] and [`EchoProcessor`].
pub struct DispatcherBuilder {
    config: RouterConfig,
    parser: Option<Arc<dyn DefinitionParser>>,
    cache: Option<Option<Arc<dyn CacheService>>>,
    gate: Arc<dyn AuthGate>,
    processor: Arc<dyn RouteProcessor>,
}

impl DispatcherBuilder {
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn DefinitionParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Replace the cache service; `None` parses on every request.
    #[must_use]
    pub fn cache(mut self, cache: Option<Arc<dyn CacheService>>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn gate(mut self, gate: Arc<dyn AuthGate>) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub fn processor(mut self, processor: Arc<dyn RouteProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// Validate the configuration and assemble the dispatcher.
    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        let config = self.config;
        config.validate()?;

        let parser = match self.parser {
            Some(parser) => parser,
            None => parser_for(config.spec_format()?),
        };
        let cache = match self.cache {
            Some(cache) => cache,
            None if config.cache_enabled()? => {
                Some(Arc::new(MemoryCache::new(config.cache_capacity()?)) as Arc<dyn CacheService>)
            }
            None => None,
        };
        let namespace = Some(config.handler_namespace()?.to_string()).filter(|ns| !ns.is_empty());

        let dispatcher = Dispatcher {
            api_prefix: config.api_prefix()?,
            spec_prefix: config.spec_prefix()?,
            server: config.server()?.to_string(),
            spec_root: config.spec_root()?,
            definitions: DefinitionCache::new(parser, cache, config.index_document()?),
            docs: SpecDocServer::from_config(&config)?,
            registrar: RouteRegistrar::new(
                config.api_uri()?,
                namespace,
                config.api_media_type()?,
                self.gate,
                self.processor,
            ),
            tables: DashMap::new(),
            building: DashMap::new(),
            config,
        };
        info!(
            api_prefix = %dispatcher.api_prefix,
            spec_prefix = %dispatcher.spec_prefix,
            spec_root = %dispatcher.spec_root.display(),
            "Dispatcher ready"
        );
        Ok(dispatcher)
    }
}

/// Pre-routing entry point.
///
/// Classifies each request, serves specification documents, and keeps one
/// published route table per API version, rebuilt whenever the definition
/// cache hands out a different definition.
pub struct Dispatcher {
    config: RouterConfig,
    api_prefix: String,
    spec_prefix: String,
    server: String,
    spec_root: PathBuf,
    definitions: DefinitionCache,
    docs: SpecDocServer,
    registrar: RouteRegistrar,
    tables: DashMap<ApiKey, Arc<ApiRoutes>>,
    building: DashMap<ApiKey, Arc<Mutex<()>>>,
}

impl Dispatcher {
    #[must_use]
    pub fn builder(config: RouterConfig) -> DispatcherBuilder {
        DispatcherBuilder {
            config,
            parser: None,
            cache: None,
            gate: Arc::new(AllowAll),
            processor: Arc::new(EchoProcessor),
        }
    }

    /// Dispatcher with every collaborator at its default.
    pub fn from_config(config: RouterConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    #[must_use]
    pub fn spec_root(&self) -> &Path {
        &self.spec_root
    }

    #[must_use]
    pub fn definitions(&self) -> &DefinitionCache {
        &self.definitions
    }

    /// Media type used for specification documents.
    #[must_use]
    pub fn spec_media_type(&self) -> &str {
        self.docs.media_type()
    }

    #[must_use]
    pub fn classify(&self, uri: &str) -> Classification {
        classify_with_prefixes(&self.api_prefix, &self.spec_prefix, uri)
    }

    /// Decide and, where it is ours, handle one request.
    pub fn dispatch(&self, request: IncomingRequest) -> Result<Dispatch, DispatchError> {
        match self.classify(&request.uri) {
            Classification::None => Ok(Dispatch::FallThrough),
            Classification::Spec {
                api_name,
                version,
                spec_file,
            } => {
                let address = self.config.public_api_address(&api_name, &version)?;
                let doc = self
                    .docs
                    .serve(&api_name, &version, &spec_file, &address)
                    .inspect_err(|e| debug!(api_name, version, error = %e, "Document not served"))?;
                Ok(Dispatch::Document(doc))
            }
            Classification::Api { api_name, version } => {
                self.dispatch_api(request, api_name, version).map(Dispatch::Api)
            }
        }
    }

    fn dispatch_api(
        &self,
        request: IncomingRequest,
        api_name: String,
        version: String,
    ) -> Result<HandlerResponse, DispatchError> {
        let routes = self.routes_for(&api_name, &version)?;

        let relative = request.uri.strip_prefix(&self.server).unwrap_or(&request.uri);
        let relative = relative.split('#').next().unwrap_or_default();
        let (path, query) = match relative.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (relative.to_string(), None),
        };

        let method = request.method.clone();
        let Some(matched) = routes.router.route(&method, &path) else {
            info!(method = %method, path = %path, api_name, version, "No declared route");
            return Ok(HandlerResponse::error(404, "Not Found"));
        };
        let mut handler_request = HandlerRequest::from_incoming(request, &path, query.as_deref());
        handler_request.path_params = matched.path_params;
        Ok(matched.binding.invoke(handler_request))
    }

    /// Registered routes for one API version, building the table if needed.
    pub fn describe_routes(
        &self,
        api_name: &str,
        version: &str,
    ) -> Result<Vec<RouteDescriptor>, DispatchError> {
        let routes = self.routes_for(api_name, version)?;
        Ok(routes.router.descriptors().cloned().collect())
    }

    /// Drop the cached definition and the published table for one API version.
    pub fn invalidate(&self, api_name: &str, version: &str) -> bool {
        let Some(spec_dir) = self.spec_dir(api_name, version) else {
            return false;
        };
        let key = (api_name.to_string(), version.to_string());
        let dropped_definition = self.definitions.invalidate(&spec_dir);
        let dropped_table = self.tables.remove(&key).is_some();
        if dropped_definition || dropped_table {
            info!(api_name, version, "API version invalidated");
        }
        dropped_definition || dropped_table
    }

    /// Number of route tables currently being built.
    #[must_use]
    pub fn pending_builds(&self) -> usize {
        self.building.len()
    }

    /// `{spec_root}/{api}/{version}`, or `None` when either name is not a
    /// single plain path segment.
    fn spec_dir(&self, api_name: &str, version: &str) -> Option<PathBuf> {
        (is_plain_segment(api_name) && is_plain_segment(version))
            .then(|| self.spec_root.join(api_name).join(version))
    }

    fn routes_for(&self, api_name: &str, version: &str) -> Result<Arc<ApiRoutes>, DispatchError> {
        let spec_dir = self.spec_dir(api_name, version).ok_or_else(|| {
            warn!(api_name, version, "Rejected API name or version");
            LoadError::NotFound {
                path: self.spec_root.join(format!("{api_name}/{version}")),
            }
        })?;
        let definition = self.definitions.get_definition(&spec_dir).inspect_err(|e| {
            if e.is_not_found() {
                debug!(api_name, version, "No specification for API version");
            } else {
                error!(api_name, version, error = %e, "Specification could not be loaded");
            }
        })?;

        let key = (api_name.to_string(), version.to_string());
        if let Some(current) = self.current_table(&key, &definition) {
            return Ok(current);
        }

        let gate = Arc::clone(
            &self
                .building
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        let result = {
            let _guard = gate.lock();
            self.build_table(&key, definition, api_name, version)
        };
        drop(gate);
        self.building.remove_if(&key, |_, gate| Arc::strong_count(gate) == 1);
        result
    }

    fn build_table(
        &self,
        key: &ApiKey,
        definition: Arc<Definition>,
        api_name: &str,
        version: &str,
    ) -> Result<Arc<ApiRoutes>, DispatchError> {
        if let Some(current) = self.current_table(key, &definition) {
            return Ok(current);
        }
        let mut router = Router::new();
        self.registrar
            .register_routes(&mut router, Arc::clone(&definition), api_name, version)
            .inspect_err(|e| error!(api_name, version, error = %e, "Route registration failed"))?;
        let routes = Arc::new(ApiRoutes { definition, router });
        self.tables.insert(key.clone(), Arc::clone(&routes));
        Ok(routes)
    }

    fn current_table(&self, key: &ApiKey, definition: &Arc<Definition>) -> Option<Arc<ApiRoutes>> {
        let table = self.tables.get(key)?;
        if Arc::ptr_eq(&table.definition, definition) {
            Some(Arc::clone(table.value()))
        } else {
            debug!(api_name = %key.0, version = %key.1, "Definition changed, rebuilding routes");
            None
        }
    }
}
