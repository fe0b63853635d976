//! # Specification Documents
//!
//! Serves the files of a specification tree so clients can discover an API:
//! `GET {server}/{spec_uri}/{api}/{version}/{file}` maps to
//! `{spec_root}/{api}/{version}/{file}`.
//!
//! The index document is rewritten on the way out: its base-address line
//! (`baseUri: ...` by default) is replaced with the live public address of the
//! API, so a client loading the document talks to this server. Every other
//! line, and every other file, is passed through byte for byte.

use crate::config::{ConfigError, RouterConfig};
use regex::{NoExpand, Regex};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Failure to serve a specification document.
#[derive(Debug)]
pub enum DocError {
    /// No such document (or the name tried to leave the specification tree)
    NotFound { name: String },
    /// The document exists but could not be read
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for DocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocError::NotFound { name } => write!(f, "specification document not found: {name}"),
            DocError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocError::Io { source, .. } => Some(source),
            DocError::NotFound { .. } => None,
        }
    }
}

/// A document ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentResponse {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Matches the base-address declaration line for `key`.
fn base_address_pattern(key: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?m)^{}:[ \t]*[^\r\n]*", regex::escape(key)))
}

/// Replace the first line-anchored `key: value` declaration with `key: address`.
///
/// Line endings and all other lines are preserved.
#[must_use]
pub fn rewrite_base_address(text: &str, key: &str, address: &str) -> String {
    match base_address_pattern(key) {
        Ok(re) => re
            .replacen(text, 1, NoExpand(&format!("{key}: {address}")))
            .into_owned(),
        Err(_) => text.to_string(),
    }
}

/// True when `segment` is exactly one plain path component.
///
/// API names and versions are joined onto the specification root, so `.`,
/// `..`, separators and absolute forms are all refused.
pub(crate) fn is_plain_segment(segment: &str) -> bool {
    let mut comps = Path::new(segment).components();
    matches!(
        (comps.next(), comps.next()),
        (Some(Component::Normal(s)), None) if s == segment
    )
}

/// Serves documents from `{spec_root}/{api}/{version}/`.
#[derive(Debug, Clone)]
pub struct SpecDocServer {
    spec_root: PathBuf,
    index_document: String,
    base_address_key: String,
    media_type: String,
    base_pattern: Regex,
}

impl SpecDocServer {
    pub fn new(
        spec_root: impl Into<PathBuf>,
        index_document: impl Into<String>,
        base_address_key: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let base_address_key = base_address_key.into();
        let base_pattern = base_address_pattern(&base_address_key)?;
        Ok(Self {
            spec_root: spec_root.into(),
            index_document: index_document.into(),
            base_address_key,
            media_type: media_type.into(),
            base_pattern,
        })
    }

    /// Build from the router configuration.
    pub fn from_config(config: &RouterConfig) -> Result<Self, ConfigError> {
        let key = config.base_address_key()?;
        Self::new(
            config.spec_root()?,
            config.index_document()?,
            key,
            config.spec_media_type()?,
        )
        .map_err(|e| ConfigError::Invalid {
            key: crate::config::BASE_ADDRESS_KEY.to_string(),
            reason: e.to_string(),
        })
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Map a requested name below `{spec_root}/{api}/{version}`.
    ///
    /// `api_name` and `version` must each be a single plain segment. In the
    /// document name only plain components are kept; `..`, roots and prefixes
    /// are refused.
    fn map_path(&self, api_name: &str, version: &str, requested: &str) -> Option<PathBuf> {
        if !is_plain_segment(api_name) || !is_plain_segment(version) {
            return None;
        }
        let mut pb = self.version_dir(api_name, version);
        let mut pushed = false;
        for comp in Path::new(requested).components() {
            match comp {
                Component::Normal(s) => {
                    pb.push(s);
                    pushed = true;
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        pushed.then_some(pb)
    }

    fn version_dir(&self, api_name: &str, version: &str) -> PathBuf {
        self.spec_root.join(api_name).join(version)
    }

    /// Serve `requested` for one API version.
    ///
    /// `public_address` replaces the base-address declaration when the index
    /// document is requested.
    pub fn serve(
        &self,
        api_name: &str,
        version: &str,
        requested: &str,
        public_address: &str,
    ) -> Result<DocumentResponse, DocError> {
        let not_found = || DocError::NotFound {
            name: format!("{api_name}/{version}/{requested}"),
        };
        let path = self
            .map_path(api_name, version, requested)
            .ok_or_else(|| {
                warn!(api_name, version, requested, "Rejected specification document path");
                not_found()
            })?;
        if !path.is_file() {
            debug!(path = %path.display(), "Specification document not found");
            return Err(not_found());
        }

        let io_err = |source| DocError::Io {
            path: path.clone(),
            source,
        };
        let is_index = path == self.version_dir(api_name, version).join(&self.index_document);
        let body = if is_index {
            let text = std::fs::read_to_string(&path).map_err(io_err)?;
            let replacement = format!("{}: {public_address}", self.base_address_key);
            self.base_pattern
                .replacen(&text, 1, NoExpand(&replacement))
                .into_owned()
                .into_bytes()
        } else {
            std::fs::read(&path).map_err(io_err)?
        };

        debug!(
            path = %path.display(),
            bytes = body.len(),
            rewritten = is_index,
            "Serving specification document"
        );
        Ok(DocumentResponse {
            body,
            content_type: self.media_type.clone(),
        })
    }
}
