//! # Authentication Gate
//!
//! Every registered route runs an [`AuthGate`] before its handler. A gate either
//! lets the request through or halts it with a status and message; a halted
//! request never reaches the route processor.
//!
//! [`AllowAll`] is the default and never denies. Swap it for any other gate
//! when constructing the dispatcher:
//!
//! ```rust
//! use specroute::security::{AuthGate, HeaderTokenGate};
//! use std::sync::Arc;
//!
//! let gate: Arc<dyn AuthGate> = Arc::new(HeaderTokenGate::new("x-api-key", "secret"));
//! ```

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::registrar::RouteDescriptor;
use std::fmt;

/// Outcome of a gate denying a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    pub status: u16,
    pub message: String,
}

impl Halt {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// `401 Unauthorized`
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(401, "Unauthorized")
    }

    /// `403 Forbidden`
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(403, "Forbidden")
    }

    /// JSON error response for this halt.
    #[must_use]
    pub fn into_response(self) -> HandlerResponse {
        HandlerResponse::error(self.status, &self.message)
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl std::error::Error for Halt {}

/// Capability check run before each route handler.
pub trait AuthGate: Send + Sync {
    /// `Ok(())` lets the request through; `Err(halt)` stops it.
    fn check(&self, req: &HandlerRequest, route: &RouteDescriptor) -> Result<(), Halt>;
}

/// Gate that allows every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthGate for AllowAll {
    fn check(&self, _req: &HandlerRequest, _route: &RouteDescriptor) -> Result<(), Halt> {
        Ok(())
    }
}

/// Gate comparing one request header against a static token.
#[derive(Debug, Clone)]
pub struct HeaderTokenGate {
    header: String,
    token: String,
}

impl HeaderTokenGate {
    pub fn new(header: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            token: token.into(),
        }
    }
}

/// Byte equality whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl AuthGate for HeaderTokenGate {
    fn check(&self, req: &HandlerRequest, route: &RouteDescriptor) -> Result<(), Halt> {
        match req.get_header(&self.header) {
            Some(value) if constant_time_eq(value.as_bytes(), self.token.as_bytes()) => Ok(()),
            _ => {
                tracing::warn!(
                    request_id = %req.request_id,
                    handler = %route.handler_name,
                    header = %self.header,
                    "Request halted by authentication gate"
                );
                Err(Halt::unauthorized())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrar::HttpVerb;
    use crate::naming::HandlerName;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"s3cret", b"s3cret"));
        assert!(constant_time_eq(b"", b""));
        assert!(!constant_time_eq(b"s3cret", b"s3creT"));
        assert!(!constant_time_eq(b"s3cret", b"s3cre"));
        assert!(!constant_time_eq(b"s3cret", b"s3cretx"));
    }

    fn route() -> RouteDescriptor {
        RouteDescriptor {
            verb: HttpVerb::Get,
            path: "/api/test-api/v1/search".to_string(),
            route_path: "/search".to_string(),
            handler_name: HandlerName::new("test-api", None, "get", "/search"),
        }
    }

    fn request(headers: &[(&str, &str)]) -> HandlerRequest {
        let mut req = HandlerRequest::new(http::Method::GET, "/api/test-api/v1/search");
        for (k, v) in headers {
            req.headers.insert(k.to_string(), v.to_string());
        }
        req
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.check(&request(&[]), &route()).is_ok());
    }

    #[test]
    fn test_header_token_gate() {
        let gate = HeaderTokenGate::new("X-Api-Key", "secret");
        assert!(gate.check(&request(&[("x-api-key", "secret")]), &route()).is_ok());
        assert_eq!(
            gate.check(&request(&[("x-api-key", "wrong")]), &route()),
            Err(Halt::unauthorized())
        );
        assert_eq!(gate.check(&request(&[]), &route()), Err(Halt::unauthorized()));
    }

    #[test]
    fn test_halt_into_response() {
        let res = Halt::forbidden().into_response();
        assert_eq!(res.status, 403);
        assert_eq!(res.body["error"], "Forbidden");
    }
}
