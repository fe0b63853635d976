//! # Dispatcher Module
//!
//! The pre-routing entry point. Every request is classified first:
//!
//! - **API requests** (`{server}/{api_uri}/{api}/{version}/...`) resolve the
//!   API's definition through the [`DefinitionCache`](crate::cache::DefinitionCache),
//!   make sure a route table compiled from that definition is published, and
//!   run the matched route (auth gate, then handler).
//! - **Specification requests** (`{server}/{spec_uri}/{api}/{version}/{file}`)
//!   are served from disk by the [`SpecDocServer`](crate::docs::SpecDocServer).
//! - Everything else is returned as [`Dispatch::FallThrough`] for the next
//!   router in the chain.
//!
//! ## Route tables
//!
//! Tables are compiled into a fresh [`Router`](crate::router::Router) and only
//! published once every route registered, so a failing definition never leaves
//! a partially registered API version behind. A published table is reused for
//! as long as the cache returns the same definition; a cache miss (the files
//! changed, or the entry was invalidated) produces a new definition and the
//! table is rebuilt on the next request.
//!
//! ```rust,no_run
//! use specroute::config::RouterConfig;
//! use specroute::dispatcher::{Dispatch, Dispatcher, IncomingRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RouterConfig::from_pairs([
//!     ("server", "http://localhost:8080"),
//!     ("api_uri", "api"),
//!     ("spec_uri", "spec"),
//!     ("spec_root", "./specs"),
//!     ("handler_namespace", "Handlers"),
//! ]);
//! let dispatcher = Dispatcher::from_config(config)?;
//! let req = IncomingRequest::new(http::Method::GET, "http://localhost:8080/api/pets/v1/pets");
//! match dispatcher.dispatch(req)? {
//!     Dispatch::Api(res) => println!("{} {}", res.status, res.body),
//!     Dispatch::Document(doc) => println!("{} bytes", doc.body.len()),
//!     Dispatch::FallThrough => println!("not ours"),
//! }
//! # Ok(())
//! # }
//! ```

mod core;
mod dispatch;

pub use core::{HandlerRequest, HandlerResponse, IncomingRequest};
pub use dispatch::{Dispatch, DispatchError, Dispatcher, DispatcherBuilder};
