use serde::Serialize;

/// Parsed, in-memory form of one specification tree (one API name + version).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Definition {
    /// Human readable title (`title:`)
    pub title: Option<String>,
    /// Declared API version (`version:`); used in registered paths
    pub version: Option<String>,
    /// Declared base address (`baseUri:`)
    pub base_uri: Option<String>,
    /// Default media type (`mediaType:`)
    pub media_type: Option<String>,
    /// Top-level resources in declaration order
    pub resources: Vec<Resource>,
}

/// One resource node: a relative URI, its methods and nested resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// Relative URI including the leading slash, e.g. `/users` or `/{id}`
    pub relative_uri: String,
    pub methods: Vec<MethodDecl>,
    pub resources: Vec<Resource>,
}

/// A method declared on a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MethodDecl {
    /// Verb exactly as written in the document (not validated here)
    pub verb: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// One (verb, path template) pair declared in a [`Definition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Verb as declared
    pub verb: String,
    /// Full path template relative to the API root, e.g. `/users/{id}`
    pub path: String,
}

impl Definition {
    /// Flatten the resource tree depth-first, in declaration order.
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        let mut routes = Vec::new();
        for resource in &self.resources {
            collect_routes(resource, "", &mut routes);
        }
        routes
    }
}

fn collect_routes(resource: &Resource, parent: &str, out: &mut Vec<Route>) {
    let path = format!("{parent}{}", resource.relative_uri);
    for method in &resource.methods {
        out.push(Route {
            verb: method.verb.clone(),
            path: path.clone(),
        });
    }
    for child in &resource.resources {
        collect_routes(child, &path, out);
    }
}
