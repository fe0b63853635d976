//! # Request Classification
//!
//! Decides whether a full request URI targets a generated API endpoint, a raw
//! specification document, or neither:
//!
//! | URI                                          | Kind   |
//! |----------------------------------------------|--------|
//! | `{server}/{api_uri}/{api}/{version}/...`     | `Api`  |
//! | `{server}/{spec_uri}/{api}/{version}/{file}` | `Spec` |
//! | anything else                                | `None` |
//!
//! Prefix matching is a plain string-prefix test and the character after the
//! prefix is consumed as the separator, whatever it is: with `api_uri` set to
//! `api`, `{server}/apixname/v2` is treated like `{server}/api/name/v2`. Missing
//! components never produce a partial result; the request falls through.

use crate::config::{ConfigError, RouterConfig};
use tracing::debug;

/// What a request URI targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Api,
    Spec,
    None,
}

/// Result of classifying one request URI.
///
/// API name and version are carried by the variants themselves, so they can
/// never be absent for `Api` or `Spec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Request for a generated API endpoint
    Api { api_name: String, version: String },
    /// Request for a specification document
    Spec {
        api_name: String,
        version: String,
        spec_file: String,
    },
    /// Neither; hand the request to the next router
    None,
}

impl Classification {
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Classification::Api { .. } => RequestKind::Api,
            Classification::Spec { .. } => RequestKind::Spec,
            Classification::None => RequestKind::None,
        }
    }

    #[must_use]
    pub fn api_name(&self) -> Option<&str> {
        match self {
            Classification::Api { api_name, .. } | Classification::Spec { api_name, .. } => {
                Some(api_name)
            }
            Classification::None => None,
        }
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Classification::Api { version, .. } | Classification::Spec { version, .. } => {
                Some(version)
            }
            Classification::None => None,
        }
    }

    #[must_use]
    pub fn spec_file(&self) -> Option<&str> {
        match self {
            Classification::Spec { spec_file, .. } => Some(spec_file),
            _ => None,
        }
    }
}

/// Strip the query string and fragment from a URI remainder.
fn path_portion(rest: &str) -> &str {
    match rest.find(['?', '#']) {
        Some(idx) => &rest[..idx],
        None => rest,
    }
}

/// Remainder after the prefix and the following separator, if any.
fn after_prefix<'a>(uri: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = uri.strip_prefix(prefix)?;
    let mut chars = rest.chars();
    match chars.next() {
        Some(_) => Some(chars.as_str()),
        None => Some(""),
    }
}

fn classify_api(rest: &str) -> Classification {
    let mut parts = path_portion(rest).split('/');
    match (parts.next(), parts.next()) {
        (Some(api_name), Some(version)) if !api_name.is_empty() && !version.is_empty() => {
            Classification::Api {
                api_name: api_name.to_string(),
                version: version.to_string(),
            }
        }
        _ => Classification::None,
    }
}

fn classify_spec(rest: &str) -> Classification {
    let mut parts = path_portion(rest).splitn(3, '/');
    match (parts.next(), parts.next()) {
        (Some(api_name), Some(version)) if !api_name.is_empty() && !version.is_empty() => {
            Classification::Spec {
                api_name: api_name.to_string(),
                version: version.to_string(),
                spec_file: parts.next().unwrap_or_default().to_string(),
            }
        }
        _ => Classification::None,
    }
}

/// Classify `uri` against the prefixes derived from `config`.
///
/// Only fails when a required option (`server`, `api_uri`, `spec_uri`) is missing.
pub fn classify(config: &RouterConfig, uri: &str) -> Result<Classification, ConfigError> {
    let api_prefix = config.api_prefix()?;
    let spec_prefix = config.spec_prefix()?;
    Ok(classify_with_prefixes(&api_prefix, &spec_prefix, uri))
}

/// Classification against precomputed prefixes.
#[must_use]
pub fn classify_with_prefixes(api_prefix: &str, spec_prefix: &str, uri: &str) -> Classification {
    let result = if let Some(rest) = after_prefix(uri, api_prefix) {
        classify_api(rest)
    } else if let Some(rest) = after_prefix(uri, spec_prefix) {
        classify_spec(rest)
    } else {
        Classification::None
    };
    debug!(uri = %uri, kind = ?result.kind(), api_name = ?result.api_name(), version = ?result.version(), "Request classified");
    result
}
