//! # Handler Naming
//!
//! Deterministic identifiers for generated handlers. Every registered route is
//! associated with a class-like name derived from the API name and a
//! method-like name derived from the HTTP verb and the route path:
//!
//! ```rust
//! use specroute::naming::{class_name_for, method_name_for};
//!
//! assert_eq!(class_name_for("test-api", None), "TestApi");
//! assert_eq!(class_name_for("test-api", Some("Namespace")), "Namespace::TestApi");
//! assert_eq!(method_name_for("GET", "/users/search"), "getUsersSearch");
//! ```
//!
//! Two routes can produce the same name (for example `/users/{id}` and
//! `/users`); no collision resolution is attempted.

use std::fmt;

/// Separator between a namespace and the generated class name.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Uppercase the first character of `word`, leaving the rest untouched.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Convert a `-`/`_` delimited word list to PascalCase.
///
/// Empty words produced by leading, trailing or repeated delimiters are dropped.
#[must_use]
pub fn to_pascal_case(s: &str) -> String {
    s.split(['-', '_']).map(capitalize).collect()
}

/// Class-like identifier for an API, optionally qualified by `namespace`.
#[must_use]
pub fn class_name_for(api_name: &str, namespace: Option<&str>) -> String {
    let class = to_pascal_case(api_name);
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}{NAMESPACE_SEPARATOR}{class}"),
        _ => class,
    }
}

/// Method-like identifier for a verb + path pair.
///
/// Templated segments (`{id}`) and empty segments are skipped; every remaining
/// segment is PascalCased after the lower-cased verb.
#[must_use]
pub fn method_name_for(http_method: &str, path: &str) -> String {
    let mut name = http_method.to_ascii_lowercase();
    for segment in path.split('/') {
        if segment.is_empty() || (segment.starts_with('{') && segment.ends_with('}')) {
            continue;
        }
        name.push_str(&to_pascal_case(segment));
    }
    name
}

/// Fully qualified name of a generated handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerName {
    /// Class-like part, e.g. `Namespace::TestApi`
    pub class: String,
    /// Method-like part, e.g. `getUsersSearch`
    pub method: String,
}

impl HandlerName {
    #[must_use]
    pub fn new(api_name: &str, namespace: Option<&str>, http_method: &str, path: &str) -> Self {
        Self {
            class: class_name_for(api_name, namespace),
            method: method_name_for(http_method, path),
        }
    }
}

impl fmt::Display for HandlerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.class, NAMESPACE_SEPARATOR, self.method)
    }
}
