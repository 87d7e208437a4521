//! Service configuration
//!
//! `ChefConfig` is read from TOML, then overridden by `CHEF_*` environment
//! variables, then validated. Every section has usable defaults except the
//! shopping credentials, which must name a secret.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;

pub use crate::storage::StorageConfig;
pub use loader::ConfigLoader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChefConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub model: ModelConfig,
    pub shopping: ShoppingConfig,
    pub nutrition: NutritionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of a session record
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Lifetime of per-stage result records
    #[serde(with = "humantime_serde")]
    pub result_ttl: Duration,
    /// Stored error messages are cut to this many characters
    pub error_max_len: usize,
    pub max_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(2 * 60 * 60),
            result_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            error_max_len: 1000,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Messages endpoint for text generation
    pub endpoint: String,
    /// Endpoint returning `{"embedding": [...]}` for `{"inputText": ...}`
    pub embedding_endpoint: Option<String>,
    /// Secret holding `{"api_key": ...}`; no key header is sent when unset
    pub api_key_secret: Option<String>,
    pub recipe_model: String,
    pub nutrition_model: String,
    pub analysis_model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            embedding_endpoint: None,
            api_key_secret: None,
            recipe_model: "claude-3-5-sonnet-20241022".to_string(),
            nutrition_model: "claude-3-haiku-20240307".to_string(),
            analysis_model: "claude-3-haiku-20240307".to_string(),
            embedding_model: "amazon.titan-embed-text-v1".to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            timeout: Duration::from_secs(120),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShoppingConfig {
    pub endpoint: String,
    /// Secret holding `{"client_id": ..., "client_secret": ...}`
    pub secret_name: Option<String>,
    /// Offers requested per ingredient
    pub display: u32,
    /// Offers kept per ingredient after filtering
    pub top_n: usize,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Session `priceData` above this serialized size is trimmed
    pub max_stored_bytes: usize,
    /// Offers kept per ingredient when trimming
    pub stored_per_ingredient: usize,
}

impl Default for ShoppingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openapi.naver.com/v1/search/shop.json".to_string(),
            secret_name: None,
            display: 20,
            top_n: 10,
            timeout: Duration::from_secs(5),
            max_stored_bytes: 350_000,
            stored_per_ingredient: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NutritionStrategy {
    /// Exact, vector and fuzzy lookup against the nutrition index
    #[default]
    Index,
    /// Model-estimated nutrition, falling back to the index
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Memory,
    Opensearch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    pub strategy: NutritionStrategy,
    /// Vector matches below this similarity are ignored
    pub min_similarity: f32,
    pub index: IndexBackend,
    pub opensearch_endpoint: Option<String>,
    pub index_name: String,
    /// CSV files loaded into the index at startup
    pub seed_csv: Vec<PathBuf>,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            strategy: NutritionStrategy::Index,
            min_similarity: 0.7,
            index: IndexBackend::Memory,
            opensearch_endpoint: None,
            index_name: "ingredient-nutrition".to_string(),
            seed_csv: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(2))
    }

    pub fn result_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.result_ttl).unwrap_or_else(|_| chrono::Duration::days(7))
    }
}
