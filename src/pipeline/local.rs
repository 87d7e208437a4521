//! In-process workflow engine running the stage sequence on the tokio runtime

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::stages::{ingredient_list, StageHandlers};
use crate::abstractions::WorkflowEngine;
use crate::error::ChefError;

/// Runs recipe, price, nutrition and combine in order for one session
#[derive(Clone)]
pub struct LocalWorkflowEngine {
    stages: Arc<StageHandlers>,
}

impl LocalWorkflowEngine {
    pub fn new(stages: Arc<StageHandlers>) -> Self {
        Self { stages }
    }

    /// Run every stage to completion, stopping at the first failing stage
    ///
    /// The failing stage has already marked the session failed.
    pub async fn run(&self, input: Value) -> std::result::Result<Value, ChefError> {
        let session_id = input
            .get("sessionId")
            .cloned()
            .unwrap_or(Value::Null);
        let profile = input.get("profile").cloned().unwrap_or(Value::Null);

        let recipe_output = self
            .stages
            .recipe(&json!({ "sessionId": session_id, "profile": profile }))
            .await?;

        let ingredients = ingredient_list(
            recipe_output
                .get("recipe")
                .and_then(|recipe| recipe.get("ingredients")),
        );
        let price_output = self
            .stages
            .price(&json!({ "sessionId": session_id, "ingredients": ingredients }))
            .await?;

        let nutrition_output = self
            .stages
            .nutrition(&json!({
                "sessionId": session_id,
                "recipe": recipe_output.get("recipe"),
                "profile": profile,
            }))
            .await?;
        let nutrition_result = if nutrition_output["status"] == "completed" {
            nutrition_output
        } else {
            warn!("Continuing session {} without nutrition", session_id);
            Value::Null
        };

        self.stages
            .combine(&json!({
                "sessionId": session_id,
                "recipeResult": recipe_output,
                "pricingResult": price_output,
                "nutritionResult": nutrition_result,
                "profile": profile,
            }))
            .await
    }
}

#[async_trait]
impl WorkflowEngine for LocalWorkflowEngine {
    async fn start_execution(&self, input: Value) -> Result<String> {
        let execution_id = format!("execution-{}", Utc::now().timestamp_millis());
        let engine = self.clone();
        let id = execution_id.clone();
        tokio::spawn(async move {
            match engine.run(input).await {
                Ok(_) => info!("Execution {} finished", id),
                Err(e) => error!("Execution {} stopped: {}", id, e),
            }
        });
        Ok(execution_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::{MockHttpFetcher, MockModelClient, StaticSecretStore};
    use crate::config::{ModelConfig, NutritionConfig, SessionConfig, ShoppingConfig};
    use crate::nutrition::{MemoryNutritionIndex, NutritionService};
    use crate::pricing::ShoppingClient;
    use crate::recipe::RecipeGenerator;
    use crate::storage::{DocumentStore, MemoryStore, SessionRecord, SessionStatus};

    fn engine(store: Arc<MemoryStore>, with_secret: bool) -> LocalWorkflowEngine {
        let model = Arc::new(MockModelClient::new());
        let mut secrets = StaticSecretStore::new();
        if with_secret {
            secrets = secrets.with_secret("shop", json!({"client_id": "a", "client_secret": "b"}));
        }
        let shopping_config = ShoppingConfig {
            secret_name: Some("shop".to_string()),
            ..ShoppingConfig::default()
        };
        let nutrition = Arc::new(NutritionService::new(
            Arc::new(MemoryNutritionIndex::new()),
            model.clone(),
            NutritionConfig::default(),
            ModelConfig::default(),
        ));
        let stages = StageHandlers::new(
            store,
            RecipeGenerator::new(model, ModelConfig::default()),
            ShoppingClient::new(
                Arc::new(MockHttpFetcher::returning(json!({"items": []}))),
                Arc::new(secrets),
                shopping_config.clone(),
            ),
            nutrition,
            SessionConfig::default(),
            shopping_config,
        );
        LocalWorkflowEngine::new(Arc::new(stages))
    }

    async fn seeded_store(id: &str) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .put_session(&SessionRecord::new(id, Utc::now(), chrono::Duration::hours(1), 3))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_run_completes_with_fallback_recipe() {
        let store = seeded_store("sess_1").await;
        let result = engine(store.clone(), true)
            .run(json!({"sessionId": "sess_1", "profile": {"target": "diet"}}))
            .await
            .unwrap();

        assert_eq!(result["data"]["recipe"]["name"], "기본 diet 레시피");
        let session = store.get_session("sess_1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.phase.as_deref(), Some("all_completed"));
    }

    #[tokio::test]
    async fn test_run_stops_at_failing_stage() {
        let store = seeded_store("sess_2").await;
        let err = engine(store.clone(), false)
            .run(json!({"sessionId": "sess_2", "profile": {"target": "keto"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChefError::Credentials(_)));

        let session = store.get_session("sess_2").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert!(session.final_result.is_none());
    }

    #[tokio::test]
    async fn test_start_execution_returns_id() {
        let store = seeded_store("sess_3").await;
        let id = engine(store, true)
            .start_execution(json!({"sessionId": "sess_3"}))
            .await
            .unwrap();
        assert!(id.starts_with("execution-"));
    }
}
