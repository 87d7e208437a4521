//! Secret store abstraction
//!
//! Credentials are only ever read from a secret store. There is no inline
//! fallback: a missing secret is an error for the caller to surface.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the JSON value stored under `name`
    async fn get_secret(&self, name: &str) -> Result<Value>;
}

/// Reads secrets from `CHEF_SECRET_<NAME>` environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Environment variable holding the secret called `name`
    pub fn env_key(name: &str) -> String {
        let normalized: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("CHEF_SECRET_{normalized}")
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Value> {
        let key = Self::env_key(name);
        let raw = std::env::var(&key).map_err(|_| anyhow!("Secret {name} not set ({key})"))?;
        serde_json::from_str(&raw).with_context(|| format!("Secret {name} is not valid JSON"))
    }
}

/// Fixed in-memory secrets, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, Value>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: &str, value: Value) -> Self {
        self.secrets.insert(name.to_string(), value);
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Value> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Secret {name} not found"))
    }
}
