use std::{collections::BTreeMap, fmt};

pub type SecretName = String;

/// Opaque secret string. Never printed or serialized.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

/// Secrets resolved ahead of composition, keyed by secret name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretValues {
    values: BTreeMap<SecretName, SecretValue>,
}

impl SecretValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<SecretName>, value: SecretValue) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<SecretName>, value: impl Into<String>) -> Self {
        self.insert(name, SecretValue::new(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&SecretValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
