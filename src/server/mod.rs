//! HTTP front end: a small `tiny_http` server that runs every request through
//! the [`Dispatcher`](crate::dispatcher::Dispatcher). Requests the dispatcher
//! does not claim get a JSON 404.

pub mod http_server;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle, DEFAULT_WORKERS};
pub use response::RenderedResponse;
pub use service::{health_endpoint, AppService, HEALTH_PATH};
