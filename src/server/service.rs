use super::response::{render, RenderedResponse};
use crate::dispatcher::{Dispatcher, IncomingRequest};
use crate::ids::REQUEST_ID_HEADER;
use serde_json::json;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Path answered by [`health_endpoint`] before any dispatching.
pub const HEALTH_PATH: &str = "/health";

/// Basic health check returning `{ "status": "ok" }`.
#[must_use]
pub fn health_endpoint() -> RenderedResponse {
    RenderedResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: json!({ "status": "ok" }).to_string().into_bytes(),
    }
}

/// Turns front-end requests into dispatcher calls.
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
    server: String,
}

impl AppService {
    /// Fails only when the dispatcher's configuration has no server address.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Result<Self, crate::config::ConfigError> {
        let server = dispatcher.config().server()?.to_string();
        Ok(Self { dispatcher, server })
    }

    /// Handle one request given as method, path-and-query, headers and body.
    #[must_use]
    pub fn call(
        &self,
        method: &str,
        url: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> RenderedResponse {
        let path = url.split('?').next().unwrap_or("/");
        if path == HEALTH_PATH {
            return health_endpoint();
        }

        let Ok(http_method) = http::Method::from_bytes(method.as_bytes()) else {
            warn!(method, "Unparseable request method");
            return super::response::not_found(method, path);
        };
        let mut incoming = IncomingRequest::new(http_method, format!("{}{url}", self.server));
        incoming.headers = headers;
        incoming.body = body;

        let start = Instant::now();
        let request_id = incoming
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(REQUEST_ID_HEADER))
            .map(|(_, v)| v.clone());
        let rendered = render(self.dispatcher.dispatch(incoming), method, path);
        info!(
            method,
            path,
            status = rendered.status,
            request_id = request_id.as_deref().unwrap_or("-"),
            duration_us = start.elapsed().as_micros(),
            "Request complete"
        );
        rendered
    }

    /// Read, dispatch and answer one `tiny_http` request.
    pub fn handle(&self, mut request: tiny_http::Request) {
        let method = request.method().to_string();
        let url = request.url().to_string();
        let headers = request
            .headers()
            .iter()
            .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
            .collect();
        let mut body = Vec::new();
        if let Err(e) = request.as_reader().read_to_end(&mut body) {
            warn!(error = %e, url, "Failed to read request body");
        }

        let rendered = self.call(&method, &url, headers, body);
        if let Err(e) = request.respond(rendered.into_tiny()) {
            debug!(error = %e, url, "Client went away before the response was sent");
        }
    }
}
