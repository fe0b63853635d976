//! # Router Module
//!
//! The framework side of route registration. The registrar hands every compiled
//! route to a [`RouteTable`] as a [`RouteBinding`](crate::registrar::RouteBinding);
//! [`Router`] is the in-process table used by the dispatcher.
//!
//! ## Matching
//!
//! Path templates such as `/api/test-api/v1/users/{id}` are compiled into
//! anchored regexes at registration time. A request is matched against every
//! route registered for its verb; when several match, the route with the fewest
//! template parameters wins, so `/users/search` beats `/users/{id}`.
//! Captured parameter values are percent-decoded.
//!
//! ```rust
//! use specroute::router::Router;
//!
//! let router = Router::default();
//! assert!(router.is_empty());
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{RouteMatch, Router};

use crate::registrar::{RegistrationError, RouteBinding};

/// Anything routes can be registered with.
pub trait RouteTable {
    fn register(&mut self, binding: RouteBinding) -> Result<(), RegistrationError>;
}
