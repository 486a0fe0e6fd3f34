use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    error::{
        ComposeError, dangling_reference, duplicate_physical_name, duplicate_resource_name,
        invalid_declaration, invalid_index_spec,
    },
    resources::types::{
        BucketDeclaration, BucketProperties, IdentityPoolDeclaration, KeyAttribute, KeySchema,
        ProjectionMode, Resource, ResourceKind, ResourceName, ResourceProperties, SecondaryIndex,
        TableDeclaration, TableProperties,
    },
    types::{StackEnvironment, validate_name},
};

pub type ResourceHandle = Arc<Resource>;

/// Owns every declared resource. Other components only hold handles.
pub struct ResourceRegistry {
    environment: StackEnvironment,
    resources: BTreeMap<ResourceName, ResourceHandle>,
    /// External identifiers already taken, per kind.
    physical_names: BTreeMap<(ResourceKind, String), ResourceName>,
}

impl ResourceRegistry {
    pub fn new(environment: StackEnvironment) -> Self {
        Self {
            environment,
            resources: BTreeMap::new(),
            physical_names: BTreeMap::new(),
        }
    }

    pub fn environment(&self) -> &StackEnvironment {
        &self.environment
    }

    pub fn declare_table(&mut self, decl: TableDeclaration) -> Result<ResourceHandle, ComposeError> {
        self.ensure_available(&decl.name)?;
        validate_table_keys(&decl)?;
        if let Some(attribute) = decl.ttl_attribute.as_deref()
            && attribute.trim().is_empty()
        {
            return Err(invalid_declaration(format!(
                "table '{}' has an empty ttl_attribute",
                decl.name
            ))
            .with_identifier(decl.name.as_str()));
        }

        let physical_name = self.physical_name(&decl.name, decl.physical_name.as_deref());
        self.ensure_physical_available(ResourceKind::Table, &physical_name, &decl.name)?;
        let env = &self.environment;
        let arn = format!(
            "arn:{}:dynamodb:{}:{}:table/{}",
            env.partition, env.region, env.account, physical_name
        );
        let resource = Resource {
            name: decl.name,
            external_identifier: physical_name.clone(),
            physical_name,
            arn,
            properties: ResourceProperties::Table(TableProperties {
                key_schema: KeySchema {
                    partition_key: decl.partition_key,
                    sort_key: decl.sort_key,
                    secondary_indexes: decl.secondary_indexes,
                },
                ttl_attribute: decl.ttl_attribute,
                protection: decl.protection,
                billing: decl.billing,
            }),
        };
        Ok(self.insert(resource))
    }

    pub fn declare_bucket(
        &mut self,
        decl: BucketDeclaration,
    ) -> Result<ResourceHandle, ComposeError> {
        self.ensure_available(&decl.name)?;
        for rule in &decl.cors_rules {
            if rule.allowed_methods.is_empty() || rule.allowed_origins.is_empty() {
                return Err(invalid_declaration(format!(
                    "bucket '{}' has a cors rule without methods or origins",
                    decl.name
                ))
                .with_identifier(decl.name.as_str()));
            }
        }

        let physical_name = self
            .physical_name(&decl.name, decl.physical_name.as_deref())
            .to_lowercase();
        self.ensure_physical_available(ResourceKind::Bucket, &physical_name, &decl.name)?;
        let arn = format!("arn:{}:s3:::{}", self.environment.partition, physical_name);
        let resource = Resource {
            name: decl.name,
            external_identifier: physical_name.clone(),
            physical_name,
            arn,
            properties: ResourceProperties::Bucket(BucketProperties {
                cors_rules: decl.cors_rules,
                encryption: decl.encryption,
                block_public_access: decl.block_public_access,
            }),
        };
        Ok(self.insert(resource))
    }

    /// Only one identity pool per stack: the shared authorizer points at it.
    pub fn declare_identity_pool(
        &mut self,
        decl: IdentityPoolDeclaration,
    ) -> Result<ResourceHandle, ComposeError> {
        self.ensure_available(&decl.name)?;
        if let Some(existing) = self.identity_pool() {
            return Err(invalid_declaration(format!(
                "identity pool '{}' cannot be declared: '{}' is already the stack's identity pool",
                decl.name, existing.name
            ))
            .with_identifier(decl.name.as_str()));
        }

        let mut client_names = BTreeSet::new();
        for client in &decl.policy.clients {
            validate_name("identity pool client", &client.name)?;
            if !client_names.insert(client.name.as_str()) {
                return Err(invalid_declaration(format!(
                    "identity pool '{}' declares client '{}' twice",
                    decl.name, client.name
                ))
                .with_identifier(decl.name.as_str())
                .with_identifier(client.name.as_str()));
            }
        }

        let physical_name = self.physical_name(&decl.name, decl.physical_name.as_deref());
        let pool_id = format!("{}_{}", self.environment.region, physical_name);
        self.ensure_physical_available(ResourceKind::IdentityPool, &pool_id, &decl.name)?;
        let env = &self.environment;
        let arn = format!(
            "arn:{}:cognito-idp:{}:{}:userpool/{}",
            env.partition, env.region, env.account, pool_id
        );
        let resource = Resource {
            name: decl.name,
            physical_name,
            external_identifier: pool_id,
            arn,
            properties: ResourceProperties::IdentityPool(decl.policy),
        };
        Ok(self.insert(resource))
    }

    pub fn get(&self, name: &str) -> Option<&ResourceHandle> {
        self.resources.get(name)
    }

    /// Looks up a resource on behalf of `referrer`.
    pub fn resolve(&self, referrer: &str, name: &str) -> Result<ResourceHandle, ComposeError> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| dangling_reference(referrer, name))
    }

    pub fn identity_pool(&self) -> Option<&ResourceHandle> {
        self.resources
            .values()
            .find(|resource| resource.kind() == ResourceKind::IdentityPool)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceHandle> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn ensure_available(&self, name: &str) -> Result<(), ComposeError> {
        validate_name("resource", name)?;
        if self.resources.contains_key(name) {
            return Err(duplicate_resource_name(name));
        }
        Ok(())
    }

    /// External identifiers are unique per kind. Bucket names arrive lowercased.
    fn ensure_physical_available(
        &self,
        kind: ResourceKind,
        physical_name: &str,
        name: &str,
    ) -> Result<(), ComposeError> {
        match self.physical_names.get(&(kind, physical_name.to_string())) {
            Some(existing) => Err(duplicate_physical_name(
                &kind.to_string(),
                physical_name,
                existing,
                name,
            )),
            None => Ok(()),
        }
    }

    fn physical_name(&self, name: &str, configured: Option<&str>) -> String {
        match configured {
            Some(physical) if !physical.trim().is_empty() => physical.to_string(),
            _ => format!("{}-{}", self.environment.stack_name, name),
        }
    }

    fn insert(&mut self, resource: Resource) -> ResourceHandle {
        let handle = Arc::new(resource);
        tracing::debug!(
            target: "resources",
            resource = %handle.name,
            kind = %handle.kind(),
            external_identifier = %handle.external_identifier,
            "resource_declared"
        );
        self.physical_names.insert(
            (handle.kind(), handle.external_identifier.clone()),
            handle.name.clone(),
        );
        self.resources
            .insert(handle.name.clone(), Arc::clone(&handle));
        handle
    }
}

fn validate_table_keys(decl: &TableDeclaration) -> Result<(), ComposeError> {
    validate_key_attribute(&decl.name, "partition key", &decl.partition_key)?;
    if let Some(sort_key) = &decl.sort_key {
        validate_key_attribute(&decl.name, "sort key", sort_key)?;
        if sort_key.name == decl.partition_key.name {
            return Err(invalid_declaration(format!(
                "table '{}' uses '{}' as both partition and sort key",
                decl.name, sort_key.name
            ))
            .with_identifier(decl.name.as_str()));
        }
    }

    let mut index_names = BTreeSet::new();
    for index in &decl.secondary_indexes {
        validate_index(decl, index)?;
        if !index_names.insert(index.index_name.as_str()) {
            return Err(
                invalid_index_spec(
                    &decl.name,
                    format!("index name '{}' is used more than once", index.index_name),
                )
                .with_identifier(index.index_name.as_str()),
            );
        }
    }
    Ok(())
}

fn validate_key_attribute(
    table: &str,
    role: &str,
    attribute: &KeyAttribute,
) -> Result<(), ComposeError> {
    if attribute.name.trim().is_empty() {
        return Err(
            invalid_declaration(format!("table '{}' has an empty {}", table, role))
                .with_identifier(table),
        );
    }
    Ok(())
}

fn validate_index(decl: &TableDeclaration, index: &SecondaryIndex) -> Result<(), ComposeError> {
    if index.index_name.trim().is_empty() {
        return Err(invalid_index_spec(&decl.name, "index name cannot be empty"));
    }
    if index.partition_key.name.trim().is_empty() {
        return Err(invalid_index_spec(
            &decl.name,
            format!("index '{}' has an empty partition key", index.index_name),
        )
        .with_identifier(index.index_name.as_str()));
    }

    let same_partition = index.partition_key.name == decl.partition_key.name;
    let same_sort = index.sort_key.as_ref().map(|key| key.name.as_str())
        == decl.sort_key.as_ref().map(|key| key.name.as_str());
    if same_partition && same_sort {
        return Err(invalid_index_spec(
            &decl.name,
            format!(
                "index '{}' duplicates the table's primary key",
                index.index_name
            ),
        )
        .with_identifier(index.index_name.as_str()));
    }

    if let ProjectionMode::Include { attributes } = &index.projection
        && attributes.is_empty()
    {
        return Err(invalid_index_spec(
            &decl.name,
            format!(
                "index '{}' uses an include projection without attributes",
                index.index_name
            ),
        )
        .with_identifier(index.index_name.as_str()));
    }
    Ok(())
}
