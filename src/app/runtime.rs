//! Runtime initialization and service wiring
//!
//! Builds every collaborator from `ChefConfig` once and hands out the shared
//! handles the commands run against.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::abstractions::{
    EnvSecretStore, HttpFetcher, HttpModelClient, ModelClient, ReqwestFetcher, SecretStore,
};
use crate::api::ApiHandlers;
use crate::app::{config::AppConfig, logging::init_logging};
use crate::config::{ChefConfig, ConfigLoader, IndexBackend};
use crate::nutrition::{
    ingest_file, FoodCategory, MemoryNutritionIndex, NutritionIndex, NutritionService,
    OpenSearchIndex,
};
use crate::pipeline::{LocalWorkflowEngine, StageHandlers};
use crate::pricing::ShoppingClient;
use crate::recipe::RecipeGenerator;
use crate::session::SessionService;
use crate::storage::{DocumentStore, StorageFactory};

/// Initialize logging and load the service configuration
pub async fn initialize_app(config: &AppConfig) -> Result<ChefConfig> {
    init_logging(config);
    let chef_config = ConfigLoader::load(config.config_path.as_deref()).await?;
    debug!("Effective configuration: {:?}", chef_config);
    Ok(chef_config)
}

/// Every shared handle of a running service
#[derive(Clone)]
pub struct Services {
    pub config: ChefConfig,
    pub store: Arc<dyn DocumentStore>,
    pub model: Arc<dyn ModelClient>,
    pub index: Arc<dyn NutritionIndex>,
    pub nutrition: Arc<NutritionService>,
    pub stages: Arc<StageHandlers>,
    pub sessions: Arc<SessionService>,
    pub handlers: Arc<ApiHandlers>,
}

/// Resolve the model API key through the secret store, if one is named
async fn model_api_key(config: &ChefConfig, secrets: &dyn SecretStore) -> Result<Option<String>> {
    let Some(name) = config.model.api_key_secret.as_deref() else {
        return Ok(None);
    };
    let secret = secrets
        .get_secret(name)
        .await
        .with_context(|| format!("Failed to read model API key secret {name}"))?;
    let key = secret
        .get("api_key")
        .and_then(|v| v.as_str())
        .filter(|k| !k.is_empty())
        .with_context(|| format!("Secret {name} has no api_key"))?;
    Ok(Some(key.to_string()))
}

fn build_index(config: &ChefConfig, fetcher: Arc<dyn HttpFetcher>) -> Result<Arc<dyn NutritionIndex>> {
    match config.nutrition.index {
        IndexBackend::Memory => Ok(Arc::new(MemoryNutritionIndex::new())),
        IndexBackend::Opensearch => {
            let endpoint = config
                .nutrition
                .opensearch_endpoint
                .as_deref()
                .context("nutrition.opensearch_endpoint is required for the opensearch index")?;
            Ok(Arc::new(OpenSearchIndex::new(
                fetcher,
                endpoint,
                &config.nutrition.index_name,
            )))
        }
    }
}

/// Wire production collaborators from configuration
pub async fn build_services(config: ChefConfig) -> Result<Services> {
    let secrets: Arc<dyn SecretStore> = Arc::new(EnvSecretStore::new());
    let api_key = model_api_key(&config, secrets.as_ref()).await?;
    let model: Arc<dyn ModelClient> = Arc::new(HttpModelClient::new(&config.model, api_key)?);
    let fetcher: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::new()?);
    let store = StorageFactory::from_config(&config.storage).await?;
    let index = build_index(&config, fetcher.clone())?;

    let services = assemble(config, store, model, fetcher, secrets, index);
    seed_index(&services).await;
    Ok(services)
}

/// Wire services around the given collaborators
pub fn assemble(
    config: ChefConfig,
    store: Arc<dyn DocumentStore>,
    model: Arc<dyn ModelClient>,
    fetcher: Arc<dyn HttpFetcher>,
    secrets: Arc<dyn SecretStore>,
    index: Arc<dyn NutritionIndex>,
) -> Services {
    let nutrition = Arc::new(NutritionService::new(
        index.clone(),
        model.clone(),
        config.nutrition.clone(),
        config.model.clone(),
    ));
    let stages = Arc::new(StageHandlers::new(
        store.clone(),
        RecipeGenerator::new(model.clone(), config.model.clone())
            .with_reference_index(index.clone()),
        ShoppingClient::new(fetcher, secrets, config.shopping.clone()),
        nutrition.clone(),
        config.session.clone(),
        config.shopping.clone(),
    ));
    let workflow = Arc::new(LocalWorkflowEngine::new(stages.clone()));
    let sessions = Arc::new(SessionService::new(
        store.clone(),
        workflow,
        config.session.clone(),
    ));
    let handlers = Arc::new(ApiHandlers::new(
        sessions.clone(),
        stages.clone(),
        nutrition.clone(),
    ));
    Services {
        config,
        store,
        model,
        index,
        nutrition,
        stages,
        sessions,
        handlers,
    }
}

/// Load the configured seed spreadsheets; failures only cost coverage
async fn seed_index(services: &Services) {
    for path in &services.config.nutrition.seed_csv {
        match ingest_file(
            path,
            FoodCategory::Standard,
            services.index.as_ref(),
            services.model.as_ref(),
        )
        .await
        {
            Ok(report) => info!(
                "Seeded {} nutrition records from {}",
                report.indexed,
                path.display()
            ),
            Err(e) => warn!("Failed to seed nutrition index from {}: {:#}", path.display(), e),
        }
    }
}
