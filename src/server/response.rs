use crate::dispatcher::{Dispatch, DispatchError, HandlerResponse};
use crate::docs::DocumentResponse;
use serde_json::{json, Value};
use std::io::Cursor;
use tracing::warn;

/// A response ready to hand to the HTTP front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RenderedResponse {
    fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn into_tiny(self) -> tiny_http::Response<Cursor<Vec<u8>>> {
        let mut response = tiny_http::Response::from_data(self.body).with_status_code(self.status);
        for (name, value) in self.headers {
            match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                Ok(header) => response.add_header(header),
                Err(()) => warn!(header = %name, "Dropping invalid response header"),
            }
        }
        response
    }
}

impl From<HandlerResponse> for RenderedResponse {
    fn from(res: HandlerResponse) -> Self {
        let body = serde_json::to_vec(&res.body).unwrap_or_default();
        Self {
            status: res.status,
            headers: res.headers,
            body,
        }
    }
}

impl From<DocumentResponse> for RenderedResponse {
    fn from(doc: DocumentResponse) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), doc.content_type)],
            body: doc.body,
        }
    }
}

/// Fallback for requests no router claimed.
#[must_use]
pub fn not_found(method: &str, path: &str) -> RenderedResponse {
    RenderedResponse::json(
        404,
        &json!({ "error": "Not Found", "method": method, "path": path }),
    )
}

/// JSON error for a failed dispatch, with the status the error maps to.
#[must_use]
pub fn dispatch_error(err: &DispatchError) -> RenderedResponse {
    RenderedResponse::json(err.status(), &json!({ "error": err.to_string() }))
}

/// Render the outcome of one dispatch.
#[must_use]
pub fn render(
    outcome: Result<Dispatch, DispatchError>,
    method: &str,
    path: &str,
) -> RenderedResponse {
    match outcome {
        Ok(Dispatch::Api(res)) => res.into(),
        Ok(Dispatch::Document(doc)) => doc.into(),
        Ok(Dispatch::FallThrough) => not_found(method, path),
        Err(err) => dispatch_error(&err),
    }
}
