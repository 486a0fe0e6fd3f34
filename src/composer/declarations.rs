use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    compute::{CodeLocation, ComputeLimits, ComputeUnitName, SecretBinding},
    grants::Capability,
    resources::{BucketDeclaration, IdentityPoolDeclaration, ResourceName, TableDeclaration},
    routes::DEFAULT_IDENTITY_SOURCE,
    types::HttpMethod,
};

/// Everything `compose` consumes, grouped by dependency tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDeclarations {
    #[serde(default)]
    pub tables: Vec<TableDeclaration>,
    #[serde(default)]
    pub buckets: Vec<BucketDeclaration>,
    #[serde(default)]
    pub identity_pools: Vec<IdentityPoolDeclaration>,
    #[serde(default)]
    pub compute_units: Vec<ComputeUnitDeclaration>,
    #[serde(default)]
    pub triggers: Vec<TriggerDeclaration>,
    #[serde(default)]
    pub authorizer: Option<AuthorizerDeclaration>,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub routes: Vec<RouteDeclaration>,
}

impl StackDeclarations {
    /// Secret names bound by any compute unit.
    pub fn secret_names(&self) -> BTreeSet<&str> {
        self.compute_units
            .iter()
            .flat_map(|unit| unit.secrets.iter())
            .map(|binding| binding.secret.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    pub resource: ResourceName,
    pub capabilities: Vec<Capability>,
    pub env_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUnitDeclaration {
    pub name: ComputeUnitName,
    #[serde(flatten)]
    pub code: CodeLocation,
    #[serde(default)]
    pub limits: ComputeLimits,
    #[serde(default)]
    pub dependencies: Vec<DependencyDeclaration>,
    #[serde(default)]
    pub secrets: Vec<SecretBinding>,
}

impl ComputeUnitDeclaration {
    pub fn new(name: impl Into<String>, code_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: CodeLocation::new(code_ref),
            limits: ComputeLimits::default(),
            dependencies: Vec::new(),
            secrets: Vec::new(),
        }
    }

    pub fn depends_on(
        mut self,
        resource: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
        env_key: impl Into<String>,
    ) -> Self {
        self.dependencies.push(DependencyDeclaration {
            resource: resource.into(),
            capabilities: capabilities.into_iter().collect(),
            env_key: env_key.into(),
        });
        self
    }

    pub fn binds_secret(mut self, secret: impl Into<String>, env_key: impl Into<String>) -> Self {
        self.secrets.push(SecretBinding {
            secret: secret.into(),
            env_key: env_key.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// Object uploaded to a bucket.
    ObjectCreated,
    /// User confirmed sign-up in the identity pool.
    PostConfirmation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDeclaration {
    pub source: ResourceName,
    pub event: TriggerEvent,
    pub compute_unit: ComputeUnitName,
}

fn default_identity_source() -> String {
    DEFAULT_IDENTITY_SOURCE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizerDeclaration {
    pub name: String,
    pub identity_pool: ResourceName,
    #[serde(default = "default_identity_source")]
    pub identity_source: String,
}

fn default_gateway_name() -> String {
    "Gateway".to_string()
}

fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_allow_methods() -> Vec<HttpMethod> {
    HttpMethod::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsPreflight {
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_allow_methods")]
    pub allow_methods: Vec<HttpMethod>,
    #[serde(default)]
    pub allow_headers: Vec<String>,
}

impl Default for CorsPreflight {
    fn default() -> Self {
        Self {
            allow_origins: default_allow_origins(),
            allow_methods: default_allow_methods(),
            allow_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_gateway_name")]
    pub name: String,
    #[serde(default)]
    pub cors: CorsPreflight,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            name: default_gateway_name(),
            cors: CorsPreflight::default(),
        }
    }
}

/// Per-route authorization. Always explicit: there is no inferred default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAuth {
    None,
    Authorizer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDeclaration {
    pub path: String,
    pub method: HttpMethod,
    pub compute_unit: ComputeUnitName,
    pub auth: RouteAuth,
    #[serde(default)]
    pub query_params: Vec<String>,
}

impl RouteDeclaration {
    pub fn new(
        path: impl Into<String>,
        method: HttpMethod,
        compute_unit: impl Into<String>,
        auth: RouteAuth,
    ) -> Self {
        Self {
            path: path.into(),
            method,
            compute_unit: compute_unit.into(),
            auth,
            query_params: Vec::new(),
        }
    }

    pub fn requiring(mut self, query_param: impl Into<String>) -> Self {
        self.query_params.push(query_param.into());
        self
    }
}
