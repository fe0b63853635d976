use super::build::build_definition;
use super::types::{Definition, MethodDecl, Resource};
use crate::config::SpecFormat;
use oas3::OpenApiV3Spec;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A specification document could not be turned into a [`Definition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "specification parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Turns the text of an index document into a [`Definition`].
///
/// `base_dir` is the directory holding the index document; sibling files
/// referenced from the index resolve against it.
pub trait DefinitionParser: Send + Sync {
    fn parse(&self, source: &str, base_dir: &Path) -> Result<Definition, ParseError>;
}

/// RAML-style YAML resource trees (`/resource:` keys with nested method keys).
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceTreeParser;

impl DefinitionParser for ResourceTreeParser {
    fn parse(&self, source: &str, base_dir: &Path) -> Result<Definition, ParseError> {
        build_definition(source, base_dir)
    }
}

/// OpenAPI 3 documents (YAML or JSON). Every path becomes one flat resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApiParser;

impl DefinitionParser for OpenApiParser {
    fn parse(&self, source: &str, _base_dir: &Path) -> Result<Definition, ParseError> {
        // YAML is a superset of JSON, so one deserializer covers both encodings.
        let spec: OpenApiV3Spec =
            serde_yaml::from_str(source).map_err(|e| ParseError::new(e.to_string()))?;
        let resources = spec
            .paths
            .iter()
            .flatten()
            .map(|(path, item)| Resource {
                relative_uri: path.clone(),
                methods: item
                    .methods()
                    .into_iter()
                    .map(|(method, operation)| MethodDecl {
                        verb: method.as_str().to_ascii_lowercase(),
                        display_name: operation.operation_id.clone(),
                        description: operation.summary.clone(),
                    })
                    .collect(),
                resources: Vec::new(),
            })
            .collect();
        Ok(Definition {
            title: Some(spec.info.title.clone()),
            version: Some(spec.info.version.clone()),
            base_uri: spec.servers.first().map(|s| s.url.clone()),
            media_type: None,
            resources,
        })
    }
}

/// Parser matching the configured specification format.
#[must_use]
pub fn parser_for(format: SpecFormat) -> Arc<dyn DefinitionParser> {
    match format {
        SpecFormat::Raml => Arc::new(ResourceTreeParser),
        SpecFormat::OpenApi => Arc::new(OpenApiParser),
    }
}
