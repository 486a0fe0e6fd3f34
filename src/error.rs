use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeErrorKind {
    DuplicateResourceName,
    InvalidIndexSpec,
    UnknownResourceKind,
    DuplicateEnvironmentKey,
    DuplicateMethodBinding,
    DanglingReference,
    UngrantedConfiguration,
    MissingSecret,
    InvalidDeclaration,
}

/// Composition-time failure. Every error aborts the whole `compose` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ComposeError {
    pub kind: ComposeErrorKind,
    pub message: String,
    /// Names of the declarations involved, outermost first.
    #[serde(default)]
    pub identifiers: Vec<String>,
}

impl ComposeError {
    pub fn new(kind: ComposeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            identifiers: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifiers.push(identifier.into());
        self
    }

    pub fn names(&self, identifier: &str) -> bool {
        self.identifiers.iter().any(|item| item == identifier)
    }
}

pub fn duplicate_resource_name(name: &str) -> ComposeError {
    ComposeError::new(
        ComposeErrorKind::DuplicateResourceName,
        format!("resource '{}' is already declared", name),
    )
    .with_identifier(name)
}

pub fn duplicate_physical_name(
    kind: &str,
    physical_name: &str,
    existing: &str,
    name: &str,
) -> ComposeError {
    ComposeError::new(
        ComposeErrorKind::DuplicateResourceName,
        format!(
            "{} '{}' resolves to physical name '{}' already taken by '{}'",
            kind, name, physical_name, existing
        ),
    )
    .with_identifier(name)
    .with_identifier(existing)
    .with_identifier(physical_name)
}

pub fn invalid_index_spec(table: &str, message: impl Into<String>) -> ComposeError {
    ComposeError::new(
        ComposeErrorKind::InvalidIndexSpec,
        format!("table '{}': {}", table, message.into()),
    )
    .with_identifier(table)
}

pub fn unknown_resource_kind(message: impl Into<String>) -> ComposeError {
    ComposeError::new(ComposeErrorKind::UnknownResourceKind, message)
}

pub fn duplicate_environment_key(unit: &str, env_key: &str) -> ComposeError {
    ComposeError::new(
        ComposeErrorKind::DuplicateEnvironmentKey,
        format!(
            "compute unit '{}' binds environment key '{}' more than once",
            unit, env_key
        ),
    )
    .with_identifier(unit)
    .with_identifier(env_key)
}

pub fn duplicate_method_binding(path: &str, method: &str) -> ComposeError {
    ComposeError::new(
        ComposeErrorKind::DuplicateMethodBinding,
        format!("route '{}' already binds {}", path, method),
    )
    .with_identifier(path)
    .with_identifier(method)
}

pub fn dangling_reference(referrer: &str, missing: &str) -> ComposeError {
    ComposeError::new(
        ComposeErrorKind::DanglingReference,
        format!("'{}' references undeclared '{}'", referrer, missing),
    )
    .with_identifier(missing)
    .with_identifier(referrer)
}

pub fn ungranted_configuration(unit: &str, env_key: &str, resource: &str) -> ComposeError {
    ComposeError::new(
        ComposeErrorKind::UngrantedConfiguration,
        format!(
            "compute unit '{}' injects '{}' from '{}' without a matching grant",
            unit, env_key, resource
        ),
    )
    .with_identifier(unit)
    .with_identifier(env_key)
    .with_identifier(resource)
}

pub fn missing_secret(referrer: &str, secret: &str) -> ComposeError {
    ComposeError::new(
        ComposeErrorKind::MissingSecret,
        format!("secret '{}' required by '{}' was not provisioned", secret, referrer),
    )
    .with_identifier(secret)
    .with_identifier(referrer)
}

pub fn invalid_declaration(message: impl Into<String>) -> ComposeError {
    ComposeError::new(ComposeErrorKind::InvalidDeclaration, message)
}
