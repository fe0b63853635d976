//! # Router Configuration
//!
//! [`RouterConfig`] is the flat option mapping every other module reads from.
//! It is loaded once at startup from a YAML or TOML file and never mutated:
//!
//! ```yaml
//! server: http://localhost:8080
//! api_uri: api
//! spec_uri: spec
//! spec_root: ./specs
//! handler_namespace: Handlers
//! cache_capacity: 64
//! ```
//!
//! Each option may be overridden from the environment as `SPECROUTE_<OPTION>`
//! (for example `SPECROUTE_SERVER=https://api.example.com`) when loading from a
//! file.
//!
//! Required options are not checked at load time: a missing option surfaces as
//! [`ConfigError::Missing`] the first time it is read. Binaries call
//! [`RouterConfig::validate`] to fail fast instead.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Public base address of the running server, e.g. `http://localhost:8080`.
pub const SERVER: &str = "server";
/// URI segment under which generated API endpoints live.
pub const API_URI: &str = "api_uri";
/// URI segment under which specification documents are served.
pub const SPEC_URI: &str = "spec_uri";
/// Directory holding `{api}/{version}/` specification trees.
pub const SPEC_ROOT: &str = "spec_root";
/// Namespace prefix for generated handler class names.
pub const HANDLER_NAMESPACE: &str = "handler_namespace";

pub const INDEX_DOCUMENT: &str = "index_document";
pub const BASE_ADDRESS_KEY: &str = "base_address_key";
pub const SPEC_MEDIA_TYPE: &str = "spec_media_type";
pub const API_MEDIA_TYPE: &str = "api_media_type";
pub const SPEC_FORMAT: &str = "spec_format";
pub const CACHE: &str = "cache";
pub const CACHE_CAPACITY: &str = "cache_capacity";

/// Options that have no default.
pub const REQUIRED_OPTIONS: [&str; 5] = [SERVER, API_URI, SPEC_URI, SPEC_ROOT, HANDLER_NAMESPACE];

const DEFAULTS: [(&str, &str); 7] = [
    (INDEX_DOCUMENT, "index.raml"),
    (BASE_ADDRESS_KEY, "baseUri"),
    (SPEC_MEDIA_TYPE, "application/raml+yaml"),
    (API_MEDIA_TYPE, "application/json"),
    (SPEC_FORMAT, "raml"),
    (CACHE, "on"),
    (CACHE_CAPACITY, "64"),
];

const ENV_PREFIX: &str = "SPECROUTE_";

/// Configuration error
#[derive(Debug)]
pub enum ConfigError {
    /// A required option was read but never configured
    Missing { key: String },
    /// An option holds a value of the wrong shape
    Invalid { key: String, reason: String },
    /// The configuration file could not be read
    Io { path: PathBuf, source: io::Error },
    /// The configuration file is not valid YAML/TOML
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing { key } => {
                write!(f, "missing required configuration option '{key}'")
            }
            ConfigError::Invalid { key, reason } => {
                write!(f, "invalid configuration option '{key}': {reason}")
            }
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, message } => {
                write!(f, "failed to parse config {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Which parser turns an index document into a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    /// RAML-style resource tree (YAML)
    Raml,
    /// OpenAPI 3 document
    OpenApi,
}

/// Immutable option mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterConfig {
    options: BTreeMap<String, String>,
}

impl RouterConfig {
    /// Build a configuration from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            options: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load a YAML (`.yaml`/`.yml`) or TOML (`.toml`) file and apply
    /// `SPECROUTE_*` environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
        let value: Value = if is_toml {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };
        Ok(Self::from_value(value)?.with_env_overrides())
    }

    /// Flatten a parsed document into options. Scalars are stringified.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(ConfigError::Invalid {
                    key: "<root>".to_string(),
                    reason: format!("expected a mapping, found {other}"),
                })
            }
        };
        let mut options = BTreeMap::new();
        for (key, value) in map {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => continue,
                Value::Array(_) | Value::Object(_) => {
                    return Err(ConfigError::Invalid {
                        key,
                        reason: "nested values are not supported".to_string(),
                    })
                }
            };
            options.insert(key, text);
        }
        Ok(Self { options })
    }

    /// Apply `SPECROUTE_<OPTION>` environment variables on top of the current options.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        let known = REQUIRED_OPTIONS.iter().chain(DEFAULTS.iter().map(|(k, _)| k));
        for key in known {
            let var = format!("{ENV_PREFIX}{}", key.to_ascii_uppercase());
            if let Ok(value) = std::env::var(&var) {
                tracing::debug!(option = %key, env = %var, "Configuration option overridden from environment");
                self.options.insert((*key).to_string(), value);
            }
        }
        self
    }

    /// Raw option lookup, falling back to built-in defaults.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str).or_else(|| {
            DEFAULTS
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
        })
    }

    /// Lookup that fails with [`ConfigError::Missing`] when the option is absent.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }

    /// Check every required option at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in REQUIRED_OPTIONS {
            self.require(key)?;
        }
        self.spec_format()?;
        self.cache_capacity()?;
        Ok(())
    }

    pub fn server(&self) -> Result<&str, ConfigError> {
        self.require(SERVER)
    }

    pub fn api_uri(&self) -> Result<&str, ConfigError> {
        self.require(API_URI)
    }

    pub fn spec_uri(&self) -> Result<&str, ConfigError> {
        self.require(SPEC_URI)
    }

    pub fn spec_root(&self) -> Result<PathBuf, ConfigError> {
        self.require(SPEC_ROOT).map(PathBuf::from)
    }

    pub fn handler_namespace(&self) -> Result<&str, ConfigError> {
        self.require(HANDLER_NAMESPACE)
    }

    pub fn index_document(&self) -> Result<&str, ConfigError> {
        self.require(INDEX_DOCUMENT)
    }

    pub fn base_address_key(&self) -> Result<&str, ConfigError> {
        self.require(BASE_ADDRESS_KEY)
    }

    pub fn spec_media_type(&self) -> Result<&str, ConfigError> {
        self.require(SPEC_MEDIA_TYPE)
    }

    pub fn api_media_type(&self) -> Result<&str, ConfigError> {
        self.require(API_MEDIA_TYPE)
    }

    pub fn spec_format(&self) -> Result<SpecFormat, ConfigError> {
        match self.require(SPEC_FORMAT)?.to_ascii_lowercase().as_str() {
            "raml" => Ok(SpecFormat::Raml),
            "openapi" | "oas" => Ok(SpecFormat::OpenApi),
            other => Err(ConfigError::Invalid {
                key: SPEC_FORMAT.to_string(),
                reason: format!("unknown format '{other}' (expected raml or openapi)"),
            }),
        }
    }

    /// Whether the definition cache is attached.
    pub fn cache_enabled(&self) -> Result<bool, ConfigError> {
        Ok(!matches!(
            self.require(CACHE)?.to_ascii_lowercase().as_str(),
            "off" | "false" | "0" | "no"
        ))
    }

    pub fn cache_capacity(&self) -> Result<usize, ConfigError> {
        let raw = self.require(CACHE_CAPACITY)?;
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid {
                key: CACHE_CAPACITY.to_string(),
                reason: format!("expected a positive integer, found '{raw}'"),
            }),
        }
    }

    /// `{server}/{api_uri}`
    pub fn api_prefix(&self) -> Result<String, ConfigError> {
        Ok(format!("{}/{}", self.server()?, self.api_uri()?))
    }

    /// `{server}/{spec_uri}`
    pub fn spec_prefix(&self) -> Result<String, ConfigError> {
        Ok(format!("{}/{}", self.server()?, self.spec_uri()?))
    }

    /// Public address of one API version: `{server}/{api_uri}/{api}/{version}`
    pub fn public_api_address(&self, api_name: &str, version: &str) -> Result<String, ConfigError> {
        Ok(format!("{}/{api_name}/{version}", self.api_prefix()?))
    }
}
