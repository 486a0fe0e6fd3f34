use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    composer::{
        declarations::{
            AuthorizerDeclaration, RouteAuth, StackDeclarations, TriggerDeclaration, TriggerEvent,
        },
        stack::{ComposedStack, TriggerBinding},
    },
    compute::{
        ComputeUnitDescriptor, ComputeUnitFactory, ComputeUnitName, ComputeUnitSpec,
        ResourceDependency,
    },
    error::{
        ComposeError, dangling_reference, invalid_declaration, unknown_resource_kind,
        ungranted_configuration,
    },
    grants::CapabilityGrantEngine,
    resources::{Resource, ResourceKind, ResourceProperties, ResourceRegistry},
    routes::{Authorizer, RouteTree, RouteTreeBuilder, parse_path},
    secrets::SecretValues,
    types::{StackEnvironment, validate_name},
};

const AUTHORIZER_REFERENCE: &str = "authorizer";

/// Assembles resources, compute units and routes in dependency order and
/// validates the result before handing out a snapshot.
pub struct StackComposer {
    environment: StackEnvironment,
}

impl StackComposer {
    pub fn new(environment: StackEnvironment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &StackEnvironment {
        &self.environment
    }

    #[tracing::instrument(
        name = "compose",
        target = "composer",
        skip_all,
        fields(stack = %self.environment.stack_name)
    )]
    pub fn compose(
        &self,
        declarations: &StackDeclarations,
        secrets: &SecretValues,
    ) -> Result<ComposedStack, ComposeError> {
        self.environment.validate()?;

        let registry = self.declare_resources(declarations)?;
        let authorizer = declarations
            .authorizer
            .as_ref()
            .map(|decl| build_authorizer(&registry, decl))
            .transpose()?
            .map(Arc::new);

        let mut grants = CapabilityGrantEngine::new();
        let units = build_compute_units(&registry, &mut grants, secrets, declarations)?;
        verify_configuration(&units, &grants)?;

        let triggers = bind_triggers(&registry, &units, &declarations.triggers)?;
        let routes = build_route_tree(&units, authorizer.as_ref(), declarations)?;
        let outputs = collect_outputs(&registry, declarations);

        let resources = registry
            .iter()
            .map(|resource| (resource.name.clone(), Resource::clone(resource)))
            .collect();
        let stack = ComposedStack {
            environment: self.environment.clone(),
            resources,
            compute_units: units,
            grants: grants.into_statements(),
            triggers,
            gateway: declarations.gateway.clone(),
            authorizer,
            routes,
            outputs,
            fingerprint: String::new(),
        }
        .seal()
        .map_err(|err| invalid_declaration(format!("failed to fingerprint stack: {}", err)))?;

        tracing::info!(
            target: "composer",
            resources = stack.resources.len(),
            compute_units = stack.compute_units.len(),
            grants = stack.grants.len(),
            routes = stack.routes.entries().len(),
            fingerprint = %stack.fingerprint,
            "stack_composed"
        );
        Ok(stack)
    }

    fn declare_resources(
        &self,
        declarations: &StackDeclarations,
    ) -> Result<ResourceRegistry, ComposeError> {
        let mut registry = ResourceRegistry::new(self.environment.clone());
        for table in &declarations.tables {
            registry.declare_table(table.clone())?;
        }
        for bucket in &declarations.buckets {
            registry.declare_bucket(bucket.clone())?;
        }
        for pool in &declarations.identity_pools {
            registry.declare_identity_pool(pool.clone())?;
        }
        Ok(registry)
    }
}

fn build_authorizer(
    registry: &ResourceRegistry,
    decl: &AuthorizerDeclaration,
) -> Result<Authorizer, ComposeError> {
    validate_name("authorizer", &decl.name)?;
    if decl.identity_source.trim().is_empty() {
        return Err(invalid_declaration(format!(
            "authorizer '{}' has an empty identity source header",
            decl.name
        ))
        .with_identifier(decl.name.as_str()));
    }
    let pool = registry.resolve(&decl.name, &decl.identity_pool)?;
    if pool.kind() != ResourceKind::IdentityPool {
        return Err(unknown_resource_kind(format!(
            "authorizer '{}' needs an identity pool but '{}' is a {}",
            decl.name,
            pool.name,
            pool.kind()
        ))
        .with_identifier(decl.name.as_str())
        .with_identifier(pool.name.as_str()));
    }
    Ok(Authorizer {
        name: decl.name.clone(),
        identity_pool: pool.name.clone(),
        identity_pool_arn: pool.arn.clone(),
        identity_source: decl.identity_source.clone(),
    })
}

fn build_compute_units(
    registry: &ResourceRegistry,
    grants: &mut CapabilityGrantEngine,
    secrets: &SecretValues,
    declarations: &StackDeclarations,
) -> Result<BTreeMap<ComputeUnitName, ComputeUnitDescriptor>, ComposeError> {
    let mut factory = ComputeUnitFactory::new(grants, secrets);
    let mut units = BTreeMap::new();

    for decl in &declarations.compute_units {
        if units.contains_key(&decl.name) {
            return Err(invalid_declaration(format!(
                "compute unit '{}' is declared more than once",
                decl.name
            ))
            .with_identifier(decl.name.as_str()));
        }

        let dependencies = decl
            .dependencies
            .iter()
            .map(|dependency| {
                let resource = registry.resolve(&decl.name, &dependency.resource)?;
                Ok(ResourceDependency::new(
                    &resource,
                    dependency.capabilities.iter().cloned(),
                    dependency.env_key.as_str(),
                ))
            })
            .collect::<Result<Vec<_>, ComposeError>>()?;

        let spec = ComputeUnitSpec {
            name: decl.name.clone(),
            code: decl.code.clone(),
            limits: decl.limits,
        };
        let descriptor = factory.build(spec, dependencies, decl.secrets.clone())?;
        units.insert(descriptor.name.clone(), descriptor);
    }
    Ok(units)
}

/// Every resource-derived environment entry must be backed by a grant on
/// that resource for that unit.
pub fn verify_configuration(
    units: &BTreeMap<ComputeUnitName, ComputeUnitDescriptor>,
    grants: &CapabilityGrantEngine,
) -> Result<(), ComposeError> {
    for unit in units.values() {
        for (env_key, value) in &unit.environment {
            let Some(resource) = value.resource_name() else {
                continue;
            };
            let engine_grant = grants
                .granted(resource, &unit.name)
                .filter(|set| !set.is_empty());
            let unit_grant = unit.grant_on(resource).filter(|set| !set.is_empty());
            if engine_grant.is_none() || unit_grant.is_none() {
                return Err(ungranted_configuration(&unit.name, env_key, resource));
            }
        }
    }
    Ok(())
}

fn bind_triggers(
    registry: &ResourceRegistry,
    units: &BTreeMap<ComputeUnitName, ComputeUnitDescriptor>,
    declarations: &[TriggerDeclaration],
) -> Result<Vec<TriggerBinding>, ComposeError> {
    let mut bindings = BTreeSet::new();
    for decl in declarations {
        let referrer = format!("trigger {}:{:?}", decl.source, decl.event);
        let source = registry.resolve(&referrer, &decl.source)?;
        if !units.contains_key(&decl.compute_unit) {
            return Err(dangling_reference(&referrer, &decl.compute_unit));
        }

        let expected = match decl.event {
            TriggerEvent::ObjectCreated => ResourceKind::Bucket,
            TriggerEvent::PostConfirmation => ResourceKind::IdentityPool,
        };
        if source.kind() != expected {
            return Err(unknown_resource_kind(format!(
                "{:?} triggers need a {} but '{}' is a {}",
                decl.event,
                expected,
                source.name,
                source.kind()
            ))
            .with_identifier(source.name.as_str()));
        }

        let binding = TriggerBinding {
            source: source.name.clone(),
            event: decl.event,
            target: decl.compute_unit.clone(),
        };
        if !bindings.insert(binding) {
            return Err(invalid_declaration(format!(
                "{} -> '{}' is declared more than once",
                referrer, decl.compute_unit
            ))
            .with_identifier(decl.source.as_str()));
        }
    }
    Ok(bindings.into_iter().collect())
}

fn build_route_tree(
    units: &BTreeMap<ComputeUnitName, ComputeUnitDescriptor>,
    authorizer: Option<&Arc<Authorizer>>,
    declarations: &StackDeclarations,
) -> Result<RouteTree, ComposeError> {
    let mut builder = RouteTreeBuilder::new();
    for route in &declarations.routes {
        let segments = parse_path(&route.path)?;
        let referrer = format!("{} {}", route.method, route.path);
        let unit = units
            .get(&route.compute_unit)
            .ok_or_else(|| dangling_reference(&referrer, &route.compute_unit))?;
        let auth = match route.auth {
            RouteAuth::None => None,
            RouteAuth::Authorizer => Some(
                authorizer.ok_or_else(|| dangling_reference(&referrer, AUTHORIZER_REFERENCE))?,
            ),
        };
        builder.add_route(
            segments.as_slice(),
            route.method,
            unit,
            auth,
            route.query_params.iter().cloned(),
        )?;
    }
    Ok(builder.finalize())
}

fn collect_outputs(
    registry: &ResourceRegistry,
    declarations: &StackDeclarations,
) -> BTreeMap<String, String> {
    let mut outputs = BTreeMap::new();
    for resource in registry.iter() {
        outputs.insert(
            format!("{}.name", resource.name),
            resource.physical_name.clone(),
        );
        outputs.insert(
            format!("{}.identifier", resource.name),
            resource.external_identifier.clone(),
        );
        outputs.insert(format!("{}.arn", resource.name), resource.arn.clone());
        if let ResourceProperties::IdentityPool(policy) = &resource.properties {
            for client in &policy.clients {
                // The provider assigns client ids at materialization.
                outputs.insert(
                    format!("{}.{}.client_name", resource.name, client.name),
                    client.name.clone(),
                );
            }
        }
    }
    outputs.insert("gateway.name".to_string(), declarations.gateway.name.clone());
    outputs
}
