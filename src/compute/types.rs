use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

use crate::{
    grants::{Capability, CapabilitySet},
    resources::{ResourceHandle, ResourceName},
    secrets::{SecretName, SecretValue},
};

pub type ComputeUnitName = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Runtime {
    #[default]
    #[serde(rename = "provided.al2023")]
    ProvidedAl2023,
    #[serde(rename = "nodejs20.x")]
    Nodejs20x,
}

fn default_entry_point() -> String {
    "main".to_string()
}

/// Where the packaged code lives. The locator is opaque to composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLocation {
    pub code_ref: String,
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    #[serde(default)]
    pub runtime: Runtime,
}

impl CodeLocation {
    pub fn new(code_ref: impl Into<String>) -> Self {
        Self {
            code_ref: code_ref.into(),
            entry_point: default_entry_point(),
            runtime: Runtime::default(),
        }
    }
}

fn default_memory_mb() -> u32 {
    1024
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ComputeLimits {
    #[serde(default = "default_memory_mb")]
    #[validate(range(min = 128, max = 10240))]
    pub memory_mb: u32,
    #[serde(default)]
    #[validate(range(min = 1, max = 900))]
    pub timeout_secs: Option<u32>,
}

impl Default for ComputeLimits {
    fn default() -> Self {
        Self {
            memory_mb: default_memory_mb(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeUnitSpec {
    pub name: ComputeUnitName,
    pub code: CodeLocation,
    pub limits: ComputeLimits,
}

impl ComputeUnitSpec {
    pub fn new(name: impl Into<String>, code_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: CodeLocation::new(code_ref),
            limits: ComputeLimits::default(),
        }
    }
}

/// `env_key` receives the resource's external identifier once the
/// capabilities are granted.
#[derive(Debug, Clone)]
pub struct ResourceDependency {
    pub resource: ResourceHandle,
    pub capabilities: Vec<Capability>,
    pub env_key: String,
}

impl ResourceDependency {
    pub fn new(
        resource: &ResourceHandle,
        capabilities: impl IntoIterator<Item = Capability>,
        env_key: impl Into<String>,
    ) -> Self {
        Self {
            resource: ResourceHandle::clone(resource),
            capabilities: capabilities.into_iter().collect(),
            env_key: env_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBinding {
    pub secret: SecretName,
    pub env_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EnvironmentValue {
    Resource {
        resource: ResourceName,
        value: String,
    },
    Secret {
        secret: SecretName,
        #[serde(skip)]
        value: SecretValue,
    },
}

impl EnvironmentValue {
    pub fn resource_name(&self) -> Option<&str> {
        match self {
            EnvironmentValue::Resource { resource, .. } => Some(resource),
            EnvironmentValue::Secret { .. } => None,
        }
    }

    /// Plain value for resource-derived entries; secrets stay opaque.
    pub fn plain_value(&self) -> Option<&str> {
        match self {
            EnvironmentValue::Resource { value, .. } => Some(value),
            EnvironmentValue::Secret { .. } => None,
        }
    }
}

fn serialize_grants<S: Serializer>(
    grants: &BTreeMap<ResourceName, CapabilitySet>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let rendered: BTreeMap<&str, Vec<String>> = grants
        .iter()
        .map(|(resource, set)| {
            let capabilities = set
                .capabilities()
                .iter()
                .map(ToString::to_string)
                .collect();
            (resource.as_str(), capabilities)
        })
        .collect();
    rendered.serialize(serializer)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeUnitDescriptor {
    pub name: ComputeUnitName,
    pub code: CodeLocation,
    pub limits: ComputeLimits,
    pub environment: BTreeMap<String, EnvironmentValue>,
    /// Capability edges this unit holds, keyed by resource.
    #[serde(serialize_with = "serialize_grants")]
    pub grants: BTreeMap<ResourceName, CapabilitySet>,
}

impl ComputeUnitDescriptor {
    pub fn env(&self, key: &str) -> Option<&EnvironmentValue> {
        self.environment.get(key)
    }

    pub fn grant_on(&self, resource: &str) -> Option<&CapabilitySet> {
        self.grants.get(resource)
    }
}
