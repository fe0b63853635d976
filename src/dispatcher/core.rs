use crate::ids::{RequestId, REQUEST_ID_HEADER};
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// A request as the HTTP front end hands it to the dispatcher.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    /// Full request URI, including the server address
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl IncomingRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Request data passed to a route handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Path relative to the server address, without query string
    pub path: String,
    /// Path parameters extracted from the matched template
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    /// Headers keyed by lower-cased name
    pub headers: HashMap<String, String>,
    /// Request body; JSON when it parses as JSON, a string otherwise
    pub body: Option<Value>,
}

impl HandlerRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Build from an incoming request whose URI has already been reduced to
    /// `path` and `query`.
    #[must_use]
    pub fn from_incoming(incoming: IncomingRequest, path: &str, query: Option<&str>) -> Self {
        let headers: HashMap<String, String> = incoming
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        let request_id =
            RequestId::from_header_or_new(headers.get(REQUEST_ID_HEADER).map(String::as_str));
        let query_params = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        let body = if incoming.body.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&incoming.body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&incoming.body).into_owned())
            }))
        };
        Self {
            request_id,
            method: incoming.method,
            path: path.to_string(),
            path_params: HashMap::new(),
            query_params,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Response produced by a route handler.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl HandlerResponse {
    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    /// `{"error": message}` with the given status
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}
