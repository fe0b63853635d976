//! # Definition Cache
//!
//! Parsing a specification tree is far more expensive than serving a request,
//! so parsed [`Definition`](crate::spec::Definition)s are cached per
//! specification directory and shared read-only across requests.
//!
//! ## Invalidation
//!
//! Before the index document is read, every file under its specification
//! directory is recorded together with its modification time and length. A
//! definition is stored against those stamps, so a write that races the parse
//! is still seen as a change. A lookup re-stats those files; any difference
//! (or a deleted file) evicts the entry and forces exactly one re-parse.
//!
//! ## Concurrency
//!
//! The miss path is single-flight per key: concurrent first requests for the
//! same specification wait on a per-key gate instead of parsing in parallel.
//! Gates live only while a miss is being resolved.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use specroute::cache::{DefinitionCache, MemoryCache};
//! use specroute::spec::ResourceTreeParser;
//! use std::sync::Arc;
//!
//! let defs = DefinitionCache::new(
//!     Arc::new(ResourceTreeParser),
//!     Some(Arc::new(MemoryCache::new(64))),
//!     "index.raml",
//! );
//! let definition = defs.get_definition(Path::new("specs/test-api/v1"))?;
//! ```

mod definition;
mod store;

pub use definition::{dependency_files, DefinitionCache, LoadError};
pub use store::{CacheService, FileDependency, FileStamp, MemoryCache};
