//! The four pipeline stages: recipe, price, nutrition, combine
//!
//! Each stage takes the JSON event its orchestrator would hand a function,
//! reports progress through the status tracker, persists its output and
//! answers the JSON the next stage consumes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::combine::{combine, unwrap_recipe, CombineInput};
use crate::config::{SessionConfig, ShoppingConfig};
use crate::error::{ChefError, Result};
use crate::nutrition::{effective_compliance, NutritionService};
use crate::pricing::{PriceReport, ShoppingClient};
use crate::recipe::{GeneratedRecipe, Recipe, RecipeGenerator};
use crate::session::{Profile, StatusTracker};
use crate::storage::{DocumentStore, ResultRecord, ResultType, SessionStatus, SessionUpdate};

pub const API_VERSION: &str = "v1.0";
pub const PRICE_SOURCE: &str = "naver_shopping";

/// Status written when a stage begins, succeeds or fails
pub mod phase {
    pub const RECIPE_GENERATION: &str = "recipe_generation";
    pub const RECIPE_COMPLETED: &str = "recipe_completed";
    pub const RECIPE_FAILED: &str = "recipe_generation_failed";
    pub const PRICE_LOOKUP: &str = "price_lookup";
    pub const PRICE_COMPLETED: &str = "price_completed";
    pub const PRICE_FAILED: &str = "price_lookup_failed";
    pub const NUTRITION_CALCULATION: &str = "nutrition_calculation";
    pub const NUTRITION_COMPLETED: &str = "nutrition_completed";
    pub const COMBINING: &str = "combining_results";
    pub const ALL_COMPLETED: &str = "all_completed";
    pub const COMBINE_FAILED: &str = "combining_failed";
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Required, non-empty `sessionId` of a stage event
pub fn require_session_id(event: &Value) -> Result<String> {
    event
        .get("sessionId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ChefError::MissingField("sessionId".to_string()))
}

/// Ingredient names from a list of strings or `{name}` objects, first occurrence kept
pub fn ingredient_list(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.trim().to_string()),
            Value::Object(map) => map
                .get("name")
                .or_else(|| map.get("ingredient"))
                .and_then(Value::as_str)
                .map(|name| name.trim().to_string()),
            _ => None,
        })
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}

fn total_calories(recipe: &Recipe) -> Value {
    let Some(nutrition) = &recipe.nutrition else {
        return Value::Null;
    };
    nutrition
        .get("total")
        .and_then(|t| t.get("calories"))
        .or_else(|| nutrition.get("calories"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Stage handlers sharing one store and one set of collaborators
pub struct StageHandlers {
    store: Arc<dyn DocumentStore>,
    tracker: StatusTracker,
    recipes: RecipeGenerator,
    shopping: ShoppingClient,
    nutrition: Arc<NutritionService>,
    session_config: SessionConfig,
    shopping_config: ShoppingConfig,
}

impl StageHandlers {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        recipes: RecipeGenerator,
        shopping: ShoppingClient,
        nutrition: Arc<NutritionService>,
        session_config: SessionConfig,
        shopping_config: ShoppingConfig,
    ) -> Self {
        let tracker = StatusTracker::new(store.clone(), session_config.error_max_len);
        Self {
            store,
            tracker,
            recipes,
            shopping,
            nutrition,
            session_config,
            shopping_config,
        }
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    fn result_ttl(&self, now: DateTime<Utc>) -> i64 {
        (now + self.session_config.result_ttl_chrono()).timestamp()
    }

    /// Generate the recipe for `{sessionId, profile}`
    pub async fn recipe(&self, event: &Value) -> Result<Value> {
        let session_id = require_session_id(event)?;
        let profile = event
            .get("profile")
            .map(Profile::from_value)
            .unwrap_or_default();
        info!("Recipe stage for session {} ({})", session_id, profile.target);

        self.tracker
            .update(
                &session_id,
                SessionStatus::Processing,
                phase::RECIPE_GENERATION,
                10,
                None,
            )
            .await;

        let generated = self.recipes.generate(&profile).await;
        match self.store_recipe(&session_id, &profile, &generated).await {
            Ok(output) => {
                self.tracker
                    .update_with(
                        &session_id,
                        SessionStatus::Processing,
                        phase::RECIPE_COMPLETED,
                        50,
                        None,
                        SessionUpdate::new().set("recipeStatus", "completed"),
                    )
                    .await;
                info!(
                    "Recipe '{}' ready for session {} in {:?}",
                    generated.recipe.name, session_id, generated.elapsed
                );
                Ok(output)
            }
            Err(e) => {
                error!("Recipe stage failed for session {}: {}", session_id, e);
                self.tracker
                    .update(
                        &session_id,
                        SessionStatus::Failed,
                        phase::RECIPE_FAILED,
                        0,
                        Some(&e.to_string()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn store_recipe(
        &self,
        session_id: &str,
        profile: &Profile,
        generated: &GeneratedRecipe,
    ) -> Result<Value> {
        let now = Utc::now();
        let recipe = serde_json::to_value(&generated.recipe)?;
        let generated_at = timestamp(now);
        let record = ResultRecord {
            result_id: ResultType::Recipe.result_id(session_id),
            session_id: session_id.to_string(),
            result_type: ResultType::Recipe,
            data: json!({ "recipe": recipe, "generatedAt": generated_at }),
            metadata: json!({
                "target": profile.target,
                "profileData": profile,
                "generationTime": generated.elapsed.as_millis() as u64,
                "apiVersion": API_VERSION,
                "source": generated.source,
            }),
            summary: json!({
                "recipeName": generated.recipe.name,
                "servings": generated.recipe.servings.unwrap_or(profile.servings),
                "cookingTime": generated.recipe.cooking_time,
                "difficulty": generated.recipe.difficulty,
                "totalCalories": total_calories(&generated.recipe),
                "target": profile.target,
            }),
            created_at: now,
            ttl: self.result_ttl(now),
        };
        self.store.put_result(&record).await?;
        Ok(json!({ "recipe": recipe, "generatedAt": generated_at }))
    }

    /// Look up prices for `ingredients`, persisting them when a session is given
    ///
    /// The HTTP route may omit the session; the orchestrated stage requires it.
    pub async fn price_lookup(
        &self,
        session_id: Option<&str>,
        ingredients: &[String],
    ) -> Result<Value> {
        if let Some(id) = session_id {
            self.tracker
                .update(id, SessionStatus::Processing, phase::PRICE_LOOKUP, 60, None)
                .await;
        }

        let results = match self.shopping.lookup_all(ingredients).await {
            Ok(results) => results,
            Err(e) => {
                error!(
                    "Price lookup failed for session {}: {}",
                    session_id.unwrap_or("-"),
                    e
                );
                if let Some(id) = session_id {
                    self.tracker
                        .update(
                            id,
                            SessionStatus::Failed,
                            phase::PRICE_FAILED,
                            60,
                            Some(&e.to_string()),
                        )
                        .await;
                }
                return Err(e);
            }
        };

        let report = PriceReport::from_results(results);
        let now = Utc::now();
        info!(
            "Prices for {} of {} ingredients, {} won",
            report.summary.found_ingredients,
            report.summary.total_ingredients,
            report.recommendations.total_estimated_cost
        );

        if let Some(id) = session_id {
            self.store_prices(id, &report, now).await;
        }

        Ok(json!({
            "success": true,
            "data": report.data_json(),
            "metadata": {
                "timestamp": timestamp(now),
                "sessionId": session_id,
            },
        }))
    }

    async fn store_prices(&self, session_id: &str, report: &PriceReport, now: DateTime<Utc>) {
        let stored = report.stored_data_json(
            self.shopping_config.max_stored_bytes,
            self.shopping_config.stored_per_ingredient,
        );
        let record = ResultRecord {
            result_id: ResultType::Price.result_id(session_id),
            session_id: session_id.to_string(),
            result_type: ResultType::Price,
            data: stored.clone(),
            metadata: json!({
                "source": PRICE_SOURCE,
                "ingredientCount": report.summary.total_ingredients,
            }),
            summary: serde_json::to_value(&report.summary).unwrap_or(Value::Null),
            created_at: now,
            ttl: self.result_ttl(now),
        };
        if let Err(e) = self.store.put_result(&record).await {
            warn!("Failed to store price result for session {}: {}", session_id, e);
        }
        self.tracker
            .update_with(
                session_id,
                SessionStatus::Processing,
                phase::PRICE_COMPLETED,
                80,
                None,
                SessionUpdate::new()
                    .set("priceData", stored)
                    .set("priceUpdatedAt", now),
            )
            .await;
    }

    /// Price stage for `{sessionId, ingredients}`
    pub async fn price(&self, event: &Value) -> Result<Value> {
        let session_id = require_session_id(event)?;
        let ingredients = ingredient_list(event.get("ingredients"));
        if ingredients.is_empty() {
            return Err(ChefError::MissingField("ingredients".to_string()));
        }
        info!(
            "Price stage for session {} ({} ingredients)",
            session_id,
            ingredients.len()
        );
        self.price_lookup(Some(&session_id), &ingredients).await
    }

    /// Nutrition stage for `{sessionId, recipe | recipeData, profile}`
    ///
    /// A failure here is recorded on the session and reported in the output;
    /// the pipeline carries on without nutrition.
    pub async fn nutrition(&self, event: &Value) -> Result<Value> {
        let session_id = require_session_id(event)?;
        let profile = event
            .get("profile")
            .map(Profile::from_value)
            .unwrap_or_default();
        info!("Nutrition stage for session {}", session_id);

        self.tracker
            .update_with(
                &session_id,
                SessionStatus::Processing,
                phase::NUTRITION_CALCULATION,
                85,
                None,
                SessionUpdate::new().set("nutritionStatus", "processing"),
            )
            .await;

        let raw = event.get("recipe").or_else(|| event.get("recipeData"));
        let recipe = serde_json::from_value::<Recipe>(Value::Object(unwrap_recipe(raw)))
            .ok()
            .filter(Recipe::is_usable);
        let Some(recipe) = recipe else {
            warn!("No usable recipe for nutrition in session {}", session_id);
            self.tracker
                .set_attributes(
                    &session_id,
                    SessionUpdate::new().set("nutritionStatus", "failed"),
                )
                .await;
            return Ok(json!({
                "nutrition": Value::Null,
                "sessionId": session_id,
                "status": "failed",
                "error": "recipe is required",
            }));
        };

        let summary = self.nutrition.calculate(&recipe, &profile).await;
        let mut nutrition = serde_json::to_value(&summary)?;
        nutrition["targetCompliance"] =
            effective_compliance(&recipe, summary.target_compliance.as_ref()).unwrap_or(Value::Null);
        debug!(
            "Nutrition for session {}: {} unmatched ingredients",
            session_id,
            summary.unmatched().len()
        );

        if let Err(e) = self
            .store
            .set_result_data(
                &ResultType::Recipe.result_id(&session_id),
                "nutrition",
                nutrition.clone(),
            )
            .await
        {
            warn!(
                "Failed to attach nutrition to recipe result of session {}: {}",
                session_id, e
            );
        }

        self.tracker
            .update_with(
                &session_id,
                SessionStatus::Processing,
                phase::NUTRITION_COMPLETED,
                90,
                None,
                SessionUpdate::new().set("nutritionStatus", "completed"),
            )
            .await;

        Ok(json!({
            "nutrition": nutrition,
            "sessionId": session_id,
            "status": "completed",
        }))
    }

    /// Combine stage for `{sessionId, recipeResult, pricingResult, nutritionResult?, profile?}`
    pub async fn combine(&self, event: &Value) -> Result<Value> {
        let session_id = require_session_id(event)?;
        let input: CombineInput = serde_json::from_value(event.clone())?;
        info!("Combine stage for session {}", session_id);

        self.tracker
            .update(
                &session_id,
                SessionStatus::Processing,
                phase::COMBINING,
                90,
                None,
            )
            .await;

        let now = Utc::now();
        let combined = combine(&input, now);
        match serde_json::to_value(&combined) {
            Ok(result) => {
                self.tracker
                    .update_with(
                        &session_id,
                        SessionStatus::Completed,
                        phase::ALL_COMPLETED,
                        100,
                        None,
                        SessionUpdate::new()
                            .set("finalResult", &result)
                            .set("completedAt", now),
                    )
                    .await;
                info!("Session {} completed", session_id);
                Ok(result)
            }
            Err(e) => {
                error!("Combine stage failed for session {}: {}", session_id, e);
                self.tracker
                    .update(
                        &session_id,
                        SessionStatus::Failed,
                        phase::COMBINE_FAILED,
                        90,
                        Some(&e.to_string()),
                    )
                    .await;
                Err(e.into())
            }
        }
    }
}
