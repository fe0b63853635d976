//! Builds a [`Definition`] from a RAML-style YAML resource tree.

use super::load::ParseError;
use super::types::{Definition, MethodDecl, Resource};
use serde_yaml::{Mapping, Value};
use std::path::{Component, Path, PathBuf};

/// Maximum `!include` nesting before the document is rejected as cyclic.
const MAX_INCLUDE_DEPTH: usize = 16;

/// Resource-level keys that are attributes rather than methods.
const RESOURCE_ATTRIBUTES: [&str; 8] = [
    "description",
    "displayName",
    "uriParameters",
    "baseUriParameters",
    "type",
    "is",
    "securedBy",
    "protocols",
];

/// A value together with the directory its `!include`s resolve against.
struct Located {
    value: Value,
    base_dir: PathBuf,
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Resolve `file` against `base_dir`, refusing to leave `base_dir`.
fn include_path(base_dir: &Path, file: &str) -> Result<PathBuf, ParseError> {
    let mut path = base_dir.to_path_buf();
    for comp in Path::new(file).components() {
        match comp {
            Component::Normal(s) => path.push(s),
            Component::CurDir => {}
            _ => {
                return Err(ParseError::new(format!(
                    "!include '{file}' escapes the specification directory"
                )))
            }
        }
    }
    Ok(path)
}

/// Follow `!include` tags until a plain value is reached.
fn resolve(value: &Value, base_dir: &Path, depth: usize) -> Result<Located, ParseError> {
    let Value::Tagged(tagged) = value else {
        return Ok(Located {
            value: value.clone(),
            base_dir: base_dir.to_path_buf(),
        });
    };
    if tagged.tag != "include" {
        return Ok(Located {
            value: tagged.value.clone(),
            base_dir: base_dir.to_path_buf(),
        });
    }
    if depth >= MAX_INCLUDE_DEPTH {
        return Err(ParseError::new("!include nesting too deep (cycle?)"));
    }
    let file = tagged
        .value
        .as_str()
        .ok_or_else(|| ParseError::new("!include expects a file name"))?;
    let path = include_path(base_dir, file)?;
    let content = std::fs::read_to_string(&path).map_err(|e| {
        ParseError::new(format!("cannot read included file {}: {e}", path.display()))
    })?;
    let included: Value = serde_yaml::from_str(&content)
        .map_err(|e| ParseError::new(format!("{}: {e}", path.display())))?;
    let next_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    resolve(&included, &next_dir, depth + 1)
}

fn build_method(verb: &str, body: &Value) -> MethodDecl {
    let field = |name: &str| body.get(name).and_then(scalar_string);
    MethodDecl {
        verb: verb.to_string(),
        display_name: field("displayName"),
        description: field("description"),
    }
}

fn build_resource(relative_uri: &str, body: &Value, base_dir: &Path) -> Result<Resource, ParseError> {
    let located = resolve(body, base_dir, 0)?;
    let mut resource = Resource {
        relative_uri: relative_uri.to_string(),
        ..Default::default()
    };
    let map = match &located.value {
        Value::Mapping(map) => map,
        Value::Null => return Ok(resource),
        _ => {
            return Err(ParseError::new(format!(
                "resource '{relative_uri}' must be a mapping"
            )))
        }
    };
    for (key, child) in map {
        let Some(key) = key.as_str() else { continue };
        if key.starts_with('/') {
            resource
                .resources
                .push(build_resource(key, child, &located.base_dir)?);
        } else if RESOURCE_ATTRIBUTES.contains(&key) || key.starts_with('(') {
            continue;
        } else {
            let method_body = resolve(child, &located.base_dir, 0)?;
            resource.methods.push(build_method(key, &method_body.value));
        }
    }
    Ok(resource)
}

fn top_level(map: &Mapping, base_dir: &Path) -> Result<Definition, ParseError> {
    let field = |name: &str| map.get(name).and_then(scalar_string);
    let mut def = Definition {
        title: field("title"),
        version: field("version"),
        base_uri: field("baseUri"),
        media_type: field("mediaType"),
        resources: Vec::new(),
    };
    for (key, body) in map {
        if let Some(key) = key.as_str().filter(|k| k.starts_with('/')) {
            def.resources.push(build_resource(key, body, base_dir)?);
        }
    }
    Ok(def)
}

/// Parse RAML-style YAML `source`, resolving includes relative to `base_dir`.
pub fn build_definition(source: &str, base_dir: &Path) -> Result<Definition, ParseError> {
    let root: Value =
        serde_yaml::from_str(source).map_err(|e| ParseError::new(e.to_string()))?;
    let located = resolve(&root, base_dir, 0)?;
    match &located.value {
        Value::Mapping(map) => top_level(map, &located.base_dir),
        _ => Err(ParseError::new("specification root must be a mapping")),
    }
}
