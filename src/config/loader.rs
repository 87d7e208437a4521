use super::{ChefConfig, IndexBackend, NutritionStrategy};
use crate::error::ChefError;
use crate::storage::BackendType;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Upper bound for `model.max_retries`
pub const MAX_MODEL_RETRIES: u32 = 10;

/// Loads `ChefConfig` from a file, the user config dir, or defaults
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default location of the user config file
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "ai-chef", "ai-chef")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load, apply process environment overrides, and validate
    pub async fn load(explicit: Option<&Path>) -> Result<ChefConfig> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path).await?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_file(&path).await?,
                None => {
                    debug!("No config file found, using defaults");
                    ChefConfig::default()
                }
            },
        };

        Self::apply_env(&mut config, |key| std::env::var(key).ok())?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub async fn load_file(path: &Path) -> Result<ChefConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ChefConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `CHEF_*` overrides read through `lookup`
    pub fn apply_env<F>(config: &mut ChefConfig, lookup: F) -> Result<(), ChefError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("CHEF_BIND") {
            config.server.bind = bind;
        }
        if let Some(backend) = lookup("CHEF_STORAGE_BACKEND") {
            config.storage.backend = BackendType::parse(&backend).ok_or_else(|| {
                ChefError::Config(format!("Unknown storage backend: {backend}"))
            })?;
        }
        if let Some(dir) = lookup("CHEF_STORAGE_DIR") {
            config.storage.base_dir = Some(PathBuf::from(dir));
        }
        if let Some(endpoint) = lookup("CHEF_MODEL_ENDPOINT") {
            config.model.endpoint = endpoint;
        }
        if let Some(secret) = lookup("CHEF_SHOPPING_SECRET") {
            config.shopping.secret_name = Some(secret);
        }
        if let Some(strategy) = lookup("CHEF_NUTRITION_STRATEGY") {
            config.nutrition.strategy = match strategy.to_lowercase().as_str() {
                "index" => NutritionStrategy::Index,
                "model" => NutritionStrategy::Model,
                other => {
                    return Err(ChefError::Config(format!(
                        "Unknown nutrition strategy: {other}"
                    )))
                }
            };
        }
        if let Some(endpoint) = lookup("CHEF_OPENSEARCH_ENDPOINT") {
            config.nutrition.index = IndexBackend::Opensearch;
            config.nutrition.opensearch_endpoint = Some(endpoint);
        }
        Ok(())
    }

    pub fn validate(config: &ChefConfig) -> Result<(), ChefError> {
        if config.shopping.top_n == 0 {
            return Err(ChefError::Config(
                "shopping.top_n must be at least 1".to_string(),
            ));
        }
        if config.model.max_retries > MAX_MODEL_RETRIES {
            return Err(ChefError::Config(format!(
                "model.max_retries must be at most {MAX_MODEL_RETRIES}, got {}",
                config.model.max_retries
            )));
        }
        let similarity = config.nutrition.min_similarity;
        if !(similarity > 0.0 && similarity <= 1.0) {
            return Err(ChefError::Config(format!(
                "nutrition.min_similarity must be in (0, 1], got {similarity}"
            )));
        }
        if config.storage.backend == BackendType::File
            && config.storage.resolved_base_dir().is_none()
        {
            return Err(ChefError::Config(
                "storage.base_dir is required for the file backend".to_string(),
            ));
        }
        if config.nutrition.index == IndexBackend::Opensearch
            && config.nutrition.opensearch_endpoint.is_none()
        {
            return Err(ChefError::Config(
                "nutrition.opensearch_endpoint is required for the opensearch index".to_string(),
            ));
        }
        Ok(())
    }
}
