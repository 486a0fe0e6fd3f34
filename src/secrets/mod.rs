pub mod provider;
pub mod types;

use std::collections::BTreeSet;

use futures_util::future::try_join_all;

use crate::error::ComposeError;

pub use provider::{EnvSecretProvider, FileSecretProvider, InMemorySecretProvider, SecretProvider};
pub use types::{SecretName, SecretValue, SecretValues};

/// Resolves every named secret concurrently. Unprovisioned secrets are left
/// out; `compose` reports them against the unit that needs them.
pub async fn resolve_secrets<'a>(
    provider: &dyn SecretProvider,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<SecretValues, ComposeError> {
    let names: BTreeSet<&str> = names.into_iter().collect();
    let lookups = names.iter().map(|name| async move {
        let value = provider.resolve(name).await?;
        Ok::<_, ComposeError>((*name, value))
    });

    let mut resolved = SecretValues::new();
    for (name, value) in try_join_all(lookups).await? {
        match value {
            Some(value) => resolved.insert(name, value),
            None => {
                tracing::warn!(target: "secrets", secret = %name, "secret_not_provisioned");
            }
        }
    }
    tracing::debug!(
        target: "secrets",
        requested = names.len(),
        resolved = resolved.len(),
        "secrets_resolved"
    );
    Ok(resolved)
}
