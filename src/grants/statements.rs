use std::collections::BTreeSet;

use crate::{
    error::{ComposeError, unknown_resource_kind},
    grants::types::{CapabilitySet, Effect, PolicyStatement},
    resources::{Resource, ResourceKind},
};

const TABLE_READ_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DescribeTable",
    "dynamodb:GetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:Scan",
];

const TABLE_WRITE_ACTIONS: &[&str] = &[
    "dynamodb:BatchWriteItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
];

const BUCKET_READ_ACTIONS: &[&str] = &["s3:GetBucket*", "s3:GetObject*", "s3:List*"];

const BUCKET_WRITE_ACTIONS: &[&str] = &[
    "s3:Abort*",
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
];

/// Rejects capabilities the resource kind cannot honour.
pub fn ensure_supported(resource: &Resource, capabilities: &CapabilitySet) -> Result<(), ComposeError> {
    match resource.kind() {
        ResourceKind::Table | ResourceKind::Bucket => {
            if let Some(action) = capabilities.admin_actions.iter().next() {
                return Err(unknown_resource_kind(format!(
                    "admin action '{}' is not supported on {} '{}'",
                    action,
                    resource.kind(),
                    resource.name
                ))
                .with_identifier(resource.name.as_str())
                .with_identifier(action.as_str()));
            }
        }
        ResourceKind::IdentityPool => {
            if capabilities.has_data_access() {
                return Err(unknown_resource_kind(format!(
                    "identity pool '{}' only supports admin actions",
                    resource.name
                ))
                .with_identifier(resource.name.as_str()));
            }
        }
    }
    Ok(())
}

/// Renders the single statement covering `capabilities` on `resource`.
pub fn render_statement(resource: &Resource, capabilities: &CapabilitySet) -> PolicyStatement {
    let mut actions = BTreeSet::new();
    let mut resources = vec![resource.arn.clone()];

    match resource.kind() {
        ResourceKind::Table => {
            if capabilities.read {
                actions.extend(TABLE_READ_ACTIONS.iter().map(|action| action.to_string()));
            }
            if capabilities.write {
                actions.extend(TABLE_WRITE_ACTIONS.iter().map(|action| action.to_string()));
            }
            if resource.has_secondary_indexes() {
                resources.push(format!("{}/index/*", resource.arn));
            }
        }
        ResourceKind::Bucket => {
            if capabilities.read {
                actions.extend(BUCKET_READ_ACTIONS.iter().map(|action| action.to_string()));
            }
            if capabilities.write {
                actions.extend(BUCKET_WRITE_ACTIONS.iter().map(|action| action.to_string()));
            }
            resources.push(format!("{}/*", resource.arn));
        }
        ResourceKind::IdentityPool => {
            actions.extend(
                capabilities
                    .admin_actions
                    .iter()
                    .map(|action| format!("cognito-idp:{}", action)),
            );
        }
    }

    PolicyStatement {
        effect: Effect::Allow,
        actions: actions.into_iter().collect(),
        resources,
    }
}
