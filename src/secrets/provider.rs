use std::{collections::BTreeMap, env, io::ErrorKind, path::PathBuf};

use async_trait::async_trait;

use crate::{
    error::{ComposeError, ComposeErrorKind},
    secrets::types::{SecretName, SecretValue},
};

/// External secret-provisioning collaborator.
///
/// `Ok(None)` means the secret is not provisioned; `compose` turns that into
/// `MissingSecret` for whichever compute unit binds it.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Option<SecretValue>, ComposeError>;
}

/// Reads `<prefix><NAME>` from the process environment, with `-` mapped to `_`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretProvider {
    prefix: String,
}

impl EnvSecretProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn variable_for(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name.replace('-', "_").to_uppercase())
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn resolve(&self, name: &str) -> Result<Option<SecretValue>, ComposeError> {
        let var = self.variable_for(name);
        match env::var(&var) {
            Ok(value) => Ok(Some(SecretValue::new(value)).filter(|value| !value.is_blank())),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ComposeError::new(
                ComposeErrorKind::MissingSecret,
                format!("secret variable {} is not valid unicode", var),
            )
            .with_identifier(name)),
        }
    }
}

/// Reads `<dir>/<name>.<extension>`, trimming surrounding whitespace.
#[derive(Debug, Clone)]
pub struct FileSecretProvider {
    dir: PathBuf,
    extension: String,
}

impl FileSecretProvider {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        if self.extension.is_empty() {
            self.dir.join(name)
        } else {
            self.dir.join(format!("{}.{}", name, self.extension))
        }
    }
}

#[async_trait]
impl SecretProvider for FileSecretProvider {
    async fn resolve(&self, name: &str) -> Result<Option<SecretValue>, ComposeError> {
        let path = self.path_for(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let value = SecretValue::new(content.trim());
                Ok(Some(value).filter(|value| !value.is_blank()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ComposeError::new(
                ComposeErrorKind::MissingSecret,
                format!("failed to read secret file {}: {}", path.display(), err),
            )
            .with_identifier(name)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySecretProvider {
    values: BTreeMap<SecretName, SecretValue>,
}

impl InMemorySecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<SecretName>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), SecretValue::new(value));
        self
    }
}

#[async_trait]
impl SecretProvider for InMemorySecretProvider {
    async fn resolve(&self, name: &str) -> Result<Option<SecretValue>, ComposeError> {
        Ok(self.values.get(name).cloned())
    }
}
