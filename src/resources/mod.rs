pub mod registry;
pub mod types;

pub use registry::{ResourceHandle, ResourceRegistry};
pub use types::{
    AttributeType, AuthFlow, BillingMode, BucketDeclaration, BucketEncryption, BucketProperties,
    CorsRule, IdentityPoolDeclaration, IdentityPoolPolicy, KeyAttribute, KeySchema, MfaMode,
    PasswordPolicy, PoolClient, ProjectionMode, Resource, ResourceKind, ResourceName,
    ResourceProperties, SecondaryIndex, TableDeclaration, TableProperties, TableProtection,
};
