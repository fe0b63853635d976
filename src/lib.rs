//! # specroute
//!
//! **specroute** is a pre-routing dispatcher for specification-driven APIs. It
//! sits in front of a request-handling framework and decides, for every
//! request URI, whether it targets
//!
//! - a **generated API endpoint** (`{server}/{api_uri}/{api}/{version}/...`),
//!   in which case the API's specification is parsed (once, then cached),
//!   compiled into a route table and the matched route is run;
//! - a **specification document** (`{server}/{spec_uri}/{api}/{version}/{file}`),
//!   which is served from disk with its base address rewritten to the live
//!   server;
//! - **neither**, in which case the request falls through to the next router.
//!
//! ## Architecture
//!
//! - **[`classify`]** - URI classification into API / spec / none
//! - **[`naming`]** - Deterministic handler class and method names
//! - **[`spec`]** - Definition model and the specification parsers (RAML-style
//!   resource trees and OpenAPI 3)
//! - **[`cache`]** - Definition cache with per-key single-flight parsing and
//!   file-stamp invalidation
//! - **[`registrar`]** - Compiles definitions into route bindings
//! - **[`router`]** - Route table the bindings are registered with
//! - **[`security`]** - Pluggable authentication gate run before every handler
//! - **[`docs`]** - Specification document server with base-address rewriting
//! - **[`dispatcher`]** - The pre-routing entry point tying it all together
//! - **[`server`]** - `tiny_http` front end
//! - **[`hot_reload`]** - Invalidate API versions when their files change
//! - **[`config`]** / **[`telemetry`]** - Options and structured logging
//!
//! ## Layout on disk
//!
//! ```text
//! {spec_root}/
//!   pets/
//!     v1/
//!       index.raml          # index document, holds `baseUri: ...`
//!       resources/pets.raml # referenced with !include
//! ```
//!
//! ## Quick start
//!
//! ```bash
//! cat > router.yaml <<EOF
//! server: http://localhost:8080
//! api_uri: api
//! spec_uri: spec
//! spec_root: ./specs
//! handler_namespace: Handlers
//! EOF
//!
//! specroute serve --config router.yaml --watch
//! curl http://localhost:8080/api/pets/v1/pets
//! curl http://localhost:8080/spec/pets/v1/index.raml
//! ```

pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod docs;
pub mod hot_reload;
pub mod ids;
pub mod naming;
pub mod registrar;
pub mod router;
pub mod security;
pub mod server;
pub mod spec;
pub mod telemetry;

pub use classify::{classify, Classification, RequestKind};
pub use config::{ConfigError, RouterConfig};
pub use dispatcher::{Dispatch, DispatchError, Dispatcher, IncomingRequest};
pub use naming::{class_name_for, method_name_for, HandlerName};
