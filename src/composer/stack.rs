use std::{collections::BTreeMap, sync::Arc};

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::{
    composer::declarations::{GatewaySettings, TriggerEvent},
    compute::{ComputeUnitDescriptor, ComputeUnitName},
    grants::AccessStatement,
    resources::{Resource, ResourceName},
    routes::{Authorizer, RouteTree},
    types::StackEnvironment,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TriggerBinding {
    pub source: ResourceName,
    pub event: TriggerEvent,
    pub target: ComputeUnitName,
}

/// Read-only result of a successful `compose`. The only artifact handed to
/// the materialization layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedStack {
    pub(crate) environment: StackEnvironment,
    pub(crate) resources: BTreeMap<ResourceName, Resource>,
    pub(crate) compute_units: BTreeMap<ComputeUnitName, ComputeUnitDescriptor>,
    pub(crate) grants: Vec<AccessStatement>,
    pub(crate) triggers: Vec<TriggerBinding>,
    pub(crate) gateway: GatewaySettings,
    #[serde(serialize_with = "serialize_authorizer")]
    pub(crate) authorizer: Option<Arc<Authorizer>>,
    pub(crate) routes: RouteTree,
    pub(crate) outputs: BTreeMap<String, String>,
    pub(crate) fingerprint: String,
}

impl ComposedStack {
    pub fn environment(&self) -> &StackEnvironment {
        &self.environment
    }

    pub fn resources(&self) -> &BTreeMap<ResourceName, Resource> {
        &self.resources
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn compute_units(&self) -> &BTreeMap<ComputeUnitName, ComputeUnitDescriptor> {
        &self.compute_units
    }

    pub fn compute_unit(&self, name: &str) -> Option<&ComputeUnitDescriptor> {
        self.compute_units.get(name)
    }

    /// Access statements ordered by (resource, consumer).
    pub fn grants(&self) -> &[AccessStatement] {
        &self.grants
    }

    pub fn grants_on<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a AccessStatement> {
        self.grants
            .iter()
            .filter(move |statement| statement.resource == resource)
    }

    pub fn triggers(&self) -> &[TriggerBinding] {
        &self.triggers
    }

    pub fn gateway(&self) -> &GatewaySettings {
        &self.gateway
    }

    /// The declared authorizer, present even when no route uses it.
    pub fn authorizer(&self) -> Option<&Arc<Authorizer>> {
        self.authorizer.as_ref()
    }

    pub fn routes(&self) -> &RouteTree {
        &self.routes
    }

    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn seal(mut self) -> Result<Self, serde_json::Error> {
        self.fingerprint = String::new();
        let canonical = canonicalize_json(&serde_json::to_value(&self)?);
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        let digest = hasher.finalize();
        let hex = format!("{:x}", digest);
        self.fingerprint = format!("stk:{}", &hex[..24]);
        Ok(self)
    }
}

fn serialize_authorizer<S: Serializer>(
    authorizer: &Option<Arc<Authorizer>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    authorizer.as_deref().serialize(serializer)
}

fn canonicalize_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys = map.keys().cloned().collect::<Vec<_>>();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(item) = map.get(&key) {
                    sorted.insert(key, canonicalize_json(item));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize_json).collect())
        }
        primitive => primitive.clone(),
    }
}
