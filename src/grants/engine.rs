use std::collections::BTreeMap;

use crate::{
    error::ComposeError,
    grants::{
        statements::{ensure_supported, render_statement},
        types::{AccessStatement, Capability, CapabilitySet, ConsumerName, GrantResult, ResourceExports},
    },
    resources::{Resource, ResourceName},
};

/// Tracks the capability edges between resources and their consumers.
///
/// Grants merge by set union per (resource, consumer) pair, so the final
/// statement set depends only on which capabilities were requested, never on
/// the order of the requests.
#[derive(Debug, Clone, Default)]
pub struct CapabilityGrantEngine {
    edges: BTreeMap<(ResourceName, ConsumerName), AccessStatement>,
}

impl CapabilityGrantEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, resource: &Resource, capabilities: &CapabilitySet) -> Result<(), ComposeError> {
        ensure_supported(resource, capabilities)
    }

    pub fn grant(
        &mut self,
        resource: &Resource,
        consumer: &str,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<GrantResult, ComposeError> {
        let requested: CapabilitySet = capabilities.into_iter().collect();
        self.grant_set(resource, consumer, &requested)
    }

    pub fn grant_set(
        &mut self,
        resource: &Resource,
        consumer: &str,
        requested: &CapabilitySet,
    ) -> Result<GrantResult, ComposeError> {
        ensure_supported(resource, requested)
            .map_err(|err| err.with_identifier(consumer))?;

        let exports = ResourceExports {
            external_identifier: resource.external_identifier.clone(),
            arn: resource.arn.clone(),
        };
        let key = (resource.name.clone(), consumer.to_string());

        let (capabilities, changed) = match self.edges.get_mut(&key) {
            Some(existing) => {
                let changed = existing.capabilities.union(requested);
                if changed {
                    existing.statement = render_statement(resource, &existing.capabilities);
                }
                (existing.capabilities.clone(), changed)
            }
            None if requested.is_empty() => (CapabilitySet::new(), false),
            None => {
                self.edges.insert(
                    key,
                    AccessStatement {
                        resource: resource.name.clone(),
                        consumer: consumer.to_string(),
                        capabilities: requested.clone(),
                        statement: render_statement(resource, requested),
                    },
                );
                (requested.clone(), true)
            }
        };

        if changed {
            tracing::debug!(
                target: "grants",
                resource = %resource.name,
                consumer = %consumer,
                capabilities = ?capabilities.capabilities(),
                "capability_granted"
            );
        }

        Ok(GrantResult {
            resource: resource.name.clone(),
            consumer: consumer.to_string(),
            capabilities,
            changed,
            exports,
        })
    }

    pub fn granted(&self, resource: &str, consumer: &str) -> Option<&CapabilitySet> {
        self.edges
            .get(&(resource.to_string(), consumer.to_string()))
            .map(|statement| &statement.capabilities)
    }

    /// Statements attached to `resource`, ordered by consumer.
    pub fn attached_consumers(&self, resource: &str) -> Vec<&AccessStatement> {
        self.edges
            .values()
            .filter(|statement| statement.resource == resource)
            .collect()
    }

    pub fn statements(&self) -> impl Iterator<Item = &AccessStatement> {
        self.edges.values()
    }

    pub fn into_statements(self) -> Vec<AccessStatement> {
        self.edges.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
