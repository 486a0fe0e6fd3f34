use std::collections::{BTreeMap, BTreeSet};

use validator::Validate;

use crate::{
    compute::types::{
        ComputeUnitDescriptor, ComputeUnitSpec, EnvironmentValue, ResourceDependency,
        SecretBinding,
    },
    error::{ComposeError, duplicate_environment_key, invalid_declaration, missing_secret},
    grants::{CapabilityGrantEngine, CapabilitySet},
    secrets::SecretValues,
    types::{validate_environment_key, validate_name},
};

/// Builds compute-unit descriptors and attaches their grants.
///
/// A unit's descriptor depends only on its own declaration: grants are
/// merged per (resource, consumer) pair, so building units in any order
/// yields identical descriptors and statements.
pub struct ComputeUnitFactory<'a> {
    grants: &'a mut CapabilityGrantEngine,
    secrets: &'a SecretValues,
}

impl<'a> ComputeUnitFactory<'a> {
    pub fn new(grants: &'a mut CapabilityGrantEngine, secrets: &'a SecretValues) -> Self {
        Self { grants, secrets }
    }

    pub fn build(
        &mut self,
        spec: ComputeUnitSpec,
        dependencies: Vec<ResourceDependency>,
        secrets: Vec<SecretBinding>,
    ) -> Result<ComputeUnitDescriptor, ComposeError> {
        validate_spec(&spec)?;

        // Everything is checked before the first grant so a rejected unit
        // leaves no edges behind.
        let mut env_keys = BTreeSet::new();
        let env_key_iter = dependencies
            .iter()
            .map(|dependency| dependency.env_key.as_str())
            .chain(secrets.iter().map(|binding| binding.env_key.as_str()));
        for env_key in env_key_iter {
            validate_environment_key(&spec.name, env_key)?;
            if !env_keys.insert(env_key) {
                return Err(duplicate_environment_key(&spec.name, env_key));
            }
        }

        let requested: Vec<CapabilitySet> = dependencies
            .iter()
            .map(|dependency| dependency.capabilities.iter().cloned().collect())
            .collect();
        for (dependency, capabilities) in dependencies.iter().zip(&requested) {
            self.grants
                .check(&dependency.resource, capabilities)
                .map_err(|err| err.with_identifier(spec.name.as_str()))?;
        }

        let mut environment = BTreeMap::new();
        for binding in &secrets {
            let value = self
                .secrets
                .get(&binding.secret)
                .ok_or_else(|| missing_secret(&spec.name, &binding.secret))?;
            environment.insert(
                binding.env_key.clone(),
                EnvironmentValue::Secret {
                    secret: binding.secret.clone(),
                    value: value.clone(),
                },
            );
        }

        let mut unit_grants: BTreeMap<String, CapabilitySet> = BTreeMap::new();
        for (dependency, capabilities) in dependencies.iter().zip(&requested) {
            let result = self
                .grants
                .grant_set(&dependency.resource, &spec.name, capabilities)?;
            if !result.capabilities.is_empty() {
                unit_grants.insert(result.resource.clone(), result.capabilities);
            }
            environment.insert(
                dependency.env_key.clone(),
                EnvironmentValue::Resource {
                    resource: result.resource,
                    value: result.exports.external_identifier,
                },
            );
        }

        tracing::debug!(
            target: "compute",
            unit = %spec.name,
            env_keys = environment.len(),
            grants = unit_grants.len(),
            "compute_unit_built"
        );

        Ok(ComputeUnitDescriptor {
            name: spec.name,
            code: spec.code,
            limits: spec.limits,
            environment,
            grants: unit_grants,
        })
    }
}

fn validate_spec(spec: &ComputeUnitSpec) -> Result<(), ComposeError> {
    validate_name("compute unit", &spec.name)?;
    if spec.code.code_ref.trim().is_empty() {
        return Err(
            invalid_declaration(format!("compute unit '{}' has an empty code_ref", spec.name))
                .with_identifier(spec.name.as_str()),
        );
    }
    if spec.code.entry_point.trim().is_empty() {
        return Err(invalid_declaration(format!(
            "compute unit '{}' has an empty entry_point",
            spec.name
        ))
        .with_identifier(spec.name.as_str()));
    }
    spec.limits.validate().map_err(|errors| {
        invalid_declaration(format!(
            "compute unit '{}' has invalid limits: {}",
            spec.name, errors
        ))
        .with_identifier(spec.name.as_str())
    })
}
