use std::{collections::BTreeSet, sync::Arc};

use crate::{
    compute::ComputeUnitDescriptor,
    error::{ComposeError, duplicate_method_binding, invalid_declaration},
    routes::types::{Authorizer, MethodBinding, RouteNode, RouteTree},
    types::HttpMethod,
};

/// Splits `reports/parts/add` (leading and trailing slashes tolerated) into
/// segments. Empty inner segments are rejected.
pub fn parse_path(path: &str) -> Result<Vec<String>, ComposeError> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
    for segment in &segments {
        validate_segment(path, segment)?;
    }
    Ok(segments)
}

fn validate_segment(path: &str, segment: &str) -> Result<(), ComposeError> {
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '{' | '}' | '+'));
    if valid {
        return Ok(());
    }
    Err(
        invalid_declaration(format!("route '{}' has invalid segment '{}'", path, segment))
            .with_identifier(path),
    )
}

/// Grows the route tree one declaration at a time. Nodes are only ever
/// added; `finalize` freezes the result.
#[derive(Debug)]
pub struct RouteTreeBuilder {
    root: RouteNode,
    authorizer: Option<Arc<Authorizer>>,
}

impl Default for RouteTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTreeBuilder {
    pub fn new() -> Self {
        Self {
            root: RouteNode::new(""),
            authorizer: None,
        }
    }

    pub fn add_route<S: AsRef<str>>(
        &mut self,
        segments: &[S],
        method: HttpMethod,
        unit: &ComputeUnitDescriptor,
        auth: Option<&Arc<Authorizer>>,
        query_params: impl IntoIterator<Item = String>,
    ) -> Result<(), ComposeError> {
        let path = format!(
            "/{}",
            segments
                .iter()
                .map(|segment| segment.as_ref())
                .collect::<Vec<&str>>()
                .join("/")
        );
        for segment in segments {
            validate_segment(&path, segment.as_ref())?;
        }

        let required_query_params: BTreeSet<String> = query_params.into_iter().collect();
        if let Some(param) = required_query_params
            .iter()
            .find(|param| param.trim().is_empty())
        {
            return Err(invalid_declaration(format!(
                "route '{}' requires an empty query parameter '{}'",
                path, param
            ))
            .with_identifier(path.as_str()));
        }

        if let (Some(authorizer), Some(existing)) = (auth, &self.authorizer)
            && existing.as_ref() != authorizer.as_ref()
        {
            return Err(invalid_declaration(format!(
                "route '{}' uses authorizer '{}' but the tree already shares '{}'",
                path, authorizer.name, existing.name
            ))
            .with_identifier(path.as_str()));
        }

        let mut node = &mut self.root;
        for segment in segments {
            node = child_or_insert(node, segment.as_ref());
        }

        if node.methods.iter().any(|binding| binding.method == method) {
            return Err(duplicate_method_binding(&path, method.as_str()));
        }
        node.methods.push(MethodBinding {
            method,
            target: unit.name.clone(),
            required_query_params,
            auth: auth.map(Arc::clone),
        });
        if self.authorizer.is_none() {
            self.authorizer = auth.map(Arc::clone);
        }

        tracing::debug!(
            target: "routes",
            path = %path,
            method = %method,
            unit = %unit.name,
            authenticated = auth.is_some(),
            "route_bound"
        );
        Ok(())
    }

    pub fn finalize(self) -> RouteTree {
        RouteTree {
            root: self.root,
            authorizer: self.authorizer,
        }
    }
}

fn child_or_insert<'a>(node: &'a mut RouteNode, segment: &str) -> &'a mut RouteNode {
    let index = match node.children.iter().position(|child| child.segment == segment) {
        Some(index) => index,
        None => {
            node.children.push(RouteNode::new(segment));
            node.children.len() - 1
        }
    };
    &mut node.children[index]
}
