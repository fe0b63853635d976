use super::RouteTable;
use crate::registrar::{HttpVerb, RegistrationError, RouteBinding, RouteDescriptor};
use http::Method;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A route that matched a request, with its decoded path parameters.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub binding: &'a RouteBinding,
    pub path_params: HashMap<String, String>,
}

impl RouteMatch<'_> {
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    regex: Regex,
    param_names: Vec<String>,
    binding: RouteBinding,
}

/// Regex route table for one API version.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().map(|r| &r.binding.descriptor)
    }

    /// Find the route for `method` + `path` (path without query string).
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let verb = HttpVerb::from_method(method)?;
        let mut best: Option<(&CompiledRoute, regex::Captures<'_>)> = None;
        for route in self.routes.iter().filter(|r| r.binding.descriptor.verb == verb) {
            let Some(caps) = route.regex.captures(path) else {
                continue;
            };
            let better = best
                .as_ref()
                .is_none_or(|(current, _)| route.param_names.len() < current.param_names.len());
            if better {
                best = Some((route, caps));
            }
        }

        let Some((route, caps)) = best else {
            debug!(method = %method, path = %path, "No route matched");
            return None;
        };
        let path_params = route
            .param_names
            .iter()
            .zip(caps.iter().skip(1))
            .filter_map(|(name, value)| {
                let raw = value?.as_str();
                let decoded = urlencoding::decode(raw)
                    .map(std::borrow::Cow::into_owned)
                    .unwrap_or_else(|_| raw.to_string());
                Some((name.clone(), decoded))
            })
            .collect();
        debug!(
            method = %method,
            path = %path,
            handler = %route.binding.descriptor.handler_name,
            "Route matched"
        );
        Some(RouteMatch {
            binding: &route.binding,
            path_params,
        })
    }

    /// Convert a path template to an anchored regex and its parameter names.
    ///
    /// `/users/{id}` becomes `^/users/([^/]+)$` with names `["id"]`. Literal
    /// segments are escaped.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), regex::Error> {
        if path == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2 {
                pattern.push_str("/([^/]+)");
                param_names.push(segment[1..segment.len() - 1].to_string());
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}

impl RouteTable for Router {
    fn register(&mut self, binding: RouteBinding) -> Result<(), RegistrationError> {
        let descriptor = &binding.descriptor;
        if self.routes.iter().any(|r| {
            r.binding.descriptor.verb == descriptor.verb && r.binding.descriptor.path == descriptor.path
        }) {
            warn!(verb = %descriptor.verb, path = %descriptor.path, "Duplicate route");
            return Err(RegistrationError::Duplicate {
                verb: descriptor.verb,
                path: descriptor.path.clone(),
            });
        }
        let (regex, param_names) =
            Self::path_to_regex(&descriptor.path).map_err(|e| RegistrationError::MalformedRoute {
                path: descriptor.path.clone(),
                reason: e.to_string(),
            })?;
        self.routes.push(CompiledRoute {
            regex,
            param_names,
            binding,
        });
        Ok(())
    }
}
