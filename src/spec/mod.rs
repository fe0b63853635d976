//! # Specification Definitions
//!
//! In-memory model of a parsed API specification and the parsers that build it.
//! A [`Definition`] is a tree of [`Resource`]s; [`Definition::routes`] flattens
//! it into the (verb, path) pairs the registrar turns into route bindings.
//!
//! Two parsers ship with the crate:
//!
//! - [`ResourceTreeParser`] for RAML-style YAML (`/users:` resources with
//!   nested `get:`/`post:` methods and `!include` support)
//! - [`OpenApiParser`] for OpenAPI 3 documents
//!
//! Both are selected through [`parser_for`] from the `spec_format` option.

mod build;
mod load;
mod types;

pub use build::build_definition;
pub use load::{parser_for, DefinitionParser, OpenApiParser, ParseError, ResourceTreeParser};
pub use types::{Definition, MethodDecl, Resource, Route};
