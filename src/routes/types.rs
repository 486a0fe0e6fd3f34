use std::{collections::BTreeSet, sync::Arc};

use serde::{Serialize, Serializer};

use crate::{compute::ComputeUnitName, resources::ResourceName, types::HttpMethod};

pub const DEFAULT_IDENTITY_SOURCE: &str = "Authorization";

/// Shared identity-pool authorizer. Every authenticated binding points at
/// the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authorizer {
    pub name: String,
    pub identity_pool: ResourceName,
    pub identity_pool_arn: String,
    /// Request header carrying the caller's token.
    pub identity_source: String,
}

fn serialize_authorizer_ref<S: Serializer>(
    authorizer: &Option<Arc<Authorizer>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match authorizer {
        Some(authorizer) => serializer.serialize_some(&authorizer.name),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodBinding {
    pub method: HttpMethod,
    pub target: ComputeUnitName,
    pub required_query_params: BTreeSet<String>,
    #[serde(rename = "authorizer", serialize_with = "serialize_authorizer_ref")]
    pub auth: Option<Arc<Authorizer>>,
}

impl MethodBinding {
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteNodeState {
    /// Created as a path prefix; nothing bound at or below it yet.
    Unbuilt,
    /// Some descendant is bound, the node itself is not.
    PartiallyBound,
    /// At least one method is bound on the node.
    Bound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteNode {
    pub segment: String,
    /// Insertion order is path precedence.
    pub children: Vec<RouteNode>,
    pub methods: Vec<MethodBinding>,
}

impl RouteNode {
    pub(crate) fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            children: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn child(&self, segment: &str) -> Option<&RouteNode> {
        self.children.iter().find(|child| child.segment == segment)
    }

    pub fn method(&self, method: HttpMethod) -> Option<&MethodBinding> {
        self.methods.iter().find(|binding| binding.method == method)
    }

    pub fn state(&self) -> RouteNodeState {
        if !self.methods.is_empty() {
            RouteNodeState::Bound
        } else if self
            .children
            .iter()
            .any(|child| child.state() != RouteNodeState::Unbuilt)
        {
            RouteNodeState::PartiallyBound
        } else {
            RouteNodeState::Unbuilt
        }
    }
}

/// Finalized, immutable route hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTree {
    pub(crate) root: RouteNode,
    #[serde(serialize_with = "serialize_authorizer_ref")]
    pub(crate) authorizer: Option<Arc<Authorizer>>,
}

impl RouteTree {
    pub fn root(&self) -> &RouteNode {
        &self.root
    }

    pub fn authorizer(&self) -> Option<&Arc<Authorizer>> {
        self.authorizer.as_ref()
    }

    pub fn find<S: AsRef<str>>(&self, segments: &[S]) -> Option<&RouteNode> {
        segments
            .iter()
            .try_fold(&self.root, |node, segment| node.child(segment.as_ref()))
    }

    pub fn binding<S: AsRef<str>>(
        &self,
        segments: &[S],
        method: HttpMethod,
    ) -> Option<&MethodBinding> {
        self.find(segments)?.method(method)
    }

    /// Every binding in pre-order (parents before children, insertion order).
    pub fn entries(&self) -> Vec<(String, &MethodBinding)> {
        let mut entries = Vec::new();
        collect_entries(&self.root, String::new(), &mut entries);
        entries
    }

    pub fn node_count(&self) -> usize {
        count_nodes(&self.root)
    }
}

fn collect_entries<'a>(
    node: &'a RouteNode,
    path: String,
    entries: &mut Vec<(String, &'a MethodBinding)>,
) {
    let display = if path.is_empty() { "/".to_string() } else { path.clone() };
    for binding in &node.methods {
        entries.push((display.clone(), binding));
    }
    for child in &node.children {
        collect_entries(child, format!("{}/{}", path, child.segment), entries);
    }
}

fn count_nodes(node: &RouteNode) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}
