use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::HttpMethod;

pub type ResourceName = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Table,
    Bucket,
    IdentityPool,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Table => "table",
            ResourceKind::Bucket => "bucket",
            ResourceKind::IdentityPool => "identity pool",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    #[default]
    String,
    Number,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    #[serde(default, rename = "type")]
    pub attribute_type: AttributeType,
}

impl KeyAttribute {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute_type: AttributeType::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectionMode {
    All,
    KeysOnly,
    Include { attributes: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndex {
    pub index_name: String,
    pub partition_key: KeyAttribute,
    #[serde(default)]
    pub sort_key: Option<KeyAttribute>,
    pub projection: ProjectionMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub partition_key: KeyAttribute,
    #[serde(default)]
    pub sort_key: Option<KeyAttribute>,
    #[serde(default)]
    pub secondary_indexes: Vec<SecondaryIndex>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BillingMode {
    #[default]
    PayPerRequest,
    Provisioned {
        read_capacity: u32,
        write_capacity: u32,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProtection {
    #[serde(default)]
    pub point_in_time_recovery: bool,
    #[serde(default)]
    pub deletion_protection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDeclaration {
    pub name: ResourceName,
    #[serde(default)]
    pub physical_name: Option<String>,
    pub partition_key: KeyAttribute,
    #[serde(default)]
    pub sort_key: Option<KeyAttribute>,
    #[serde(default)]
    pub secondary_indexes: Vec<SecondaryIndex>,
    #[serde(default)]
    pub ttl_attribute: Option<String>,
    #[serde(default)]
    pub protection: TableProtection,
    #[serde(default)]
    pub billing: BillingMode,
}

impl TableDeclaration {
    pub fn new(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            physical_name: None,
            partition_key: KeyAttribute::string(partition_key),
            sort_key: None,
            secondary_indexes: Vec::new(),
            ttl_attribute: None,
            protection: TableProtection::default(),
            billing: BillingMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketEncryption {
    #[default]
    Managed,
    KmsManaged,
    Unencrypted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
    pub allowed_methods: Vec<HttpMethod>,
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub allowed_headers: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDeclaration {
    pub name: ResourceName,
    #[serde(default)]
    pub physical_name: Option<String>,
    #[serde(default)]
    pub cors_rules: Vec<CorsRule>,
    #[serde(default)]
    pub encryption: BucketEncryption,
    #[serde(default = "default_true")]
    pub block_public_access: bool,
}

impl BucketDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            physical_name: None,
            cors_rules: Vec::new(),
            encryption: BucketEncryption::default(),
            block_public_access: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaMode {
    #[default]
    Off,
    Optional,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFlow {
    UserPassword,
    UserSrp,
    AdminUserPassword,
    Custom,
}

fn default_min_password_length() -> u8 {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    #[serde(default = "default_min_password_length")]
    pub min_length: u8,
    #[serde(default = "default_true")]
    pub require_digits: bool,
    #[serde(default = "default_true")]
    pub require_lowercase: bool,
    #[serde(default = "default_true")]
    pub require_uppercase: bool,
    #[serde(default = "default_true")]
    pub require_symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_password_length(),
            require_digits: true,
            require_lowercase: true,
            require_uppercase: true,
            require_symbols: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolClient {
    pub name: String,
    #[serde(default)]
    pub generate_secret: bool,
    #[serde(default)]
    pub auth_flows: Vec<AuthFlow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPoolPolicy {
    #[serde(default)]
    pub self_sign_up: bool,
    #[serde(default)]
    pub sign_in_aliases: Vec<String>,
    #[serde(default)]
    pub required_attributes: Vec<String>,
    #[serde(default)]
    pub password_policy: PasswordPolicy,
    #[serde(default)]
    pub mfa: MfaMode,
    #[serde(default)]
    pub clients: Vec<PoolClient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPoolDeclaration {
    pub name: ResourceName,
    #[serde(default)]
    pub physical_name: Option<String>,
    #[serde(default)]
    pub policy: IdentityPoolPolicy,
}

impl IdentityPoolDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            physical_name: None,
            policy: IdentityPoolPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableProperties {
    pub key_schema: KeySchema,
    pub ttl_attribute: Option<String>,
    pub protection: TableProtection,
    pub billing: BillingMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketProperties {
    pub cors_rules: Vec<CorsRule>,
    pub encryption: BucketEncryption,
    pub block_public_access: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceProperties {
    Table(TableProperties),
    Bucket(BucketProperties),
    IdentityPool(IdentityPoolPolicy),
}

/// A declared resource. Immutable once the registry hands out its handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: ResourceName,
    pub physical_name: String,
    /// Value injected into consumer configuration (table name, bucket name, pool id).
    pub external_identifier: String,
    pub arn: String,
    pub properties: ResourceProperties,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self.properties {
            ResourceProperties::Table(_) => ResourceKind::Table,
            ResourceProperties::Bucket(_) => ResourceKind::Bucket,
            ResourceProperties::IdentityPool(_) => ResourceKind::IdentityPool,
        }
    }

    pub fn key_schema(&self) -> Option<&KeySchema> {
        match &self.properties {
            ResourceProperties::Table(table) => Some(&table.key_schema),
            _ => None,
        }
    }

    pub fn has_secondary_indexes(&self) -> bool {
        self.key_schema()
            .is_some_and(|schema| !schema.secondary_indexes.is_empty())
    }
}
