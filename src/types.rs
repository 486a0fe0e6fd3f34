use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ComposeError, invalid_declaration};

static DECLARATION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.-]*$").expect("static regex"));
static ENVIRONMENT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

fn default_partition() -> String {
    "aws".to_string()
}

/// Account placement of a stack. Every provider identifier is derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEnvironment {
    pub stack_name: String,
    pub account: String,
    pub region: String,
    #[serde(default = "default_partition")]
    pub partition: String,
}

impl StackEnvironment {
    pub fn new(
        stack_name: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            account: account.into(),
            region: region.into(),
            partition: default_partition(),
        }
    }

    pub fn validate(&self) -> Result<(), ComposeError> {
        for (field, value) in [
            ("stack_name", &self.stack_name),
            ("account", &self.account),
            ("region", &self.region),
            ("partition", &self.partition),
        ] {
            if value.trim().is_empty() {
                return Err(invalid_declaration(format!(
                    "environment.{} cannot be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn validate_name(what: &str, name: &str) -> Result<(), ComposeError> {
    if DECLARATION_NAME.is_match(name) {
        return Ok(());
    }
    Err(invalid_declaration(format!("invalid {} name '{}'", what, name)).with_identifier(name))
}

pub fn validate_environment_key(unit: &str, env_key: &str) -> Result<(), ComposeError> {
    if ENVIRONMENT_KEY.is_match(env_key) {
        return Ok(());
    }
    Err(invalid_declaration(format!(
        "compute unit '{}' uses invalid environment key '{}'",
        unit, env_key
    ))
    .with_identifier(unit)
    .with_identifier(env_key))
}
