//! Recipe generation through the hosted model

use super::defaults::default_recipe;
use super::extract::extract_json_object;
use super::prompts::build_grounded_prompt;
use super::types::Recipe;
use crate::abstractions::{GenerationRequest, ModelClient};
use crate::config::ModelConfig;
use crate::nutrition::{NutritionIndex, NutritionRecord};
use crate::session::Profile;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where a recipe came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct GeneratedRecipe {
    pub recipe: Recipe,
    pub source: RecipeSource,
    pub elapsed: Duration,
}

/// Most index records quoted in one prompt
pub const MAX_REFERENCE_RECORDS: usize = 10;

/// Turns a profile into a recipe; never fails
pub struct RecipeGenerator {
    model: Arc<dyn ModelClient>,
    config: ModelConfig,
    reference_index: Option<Arc<dyn NutritionIndex>>,
}

impl RecipeGenerator {
    pub fn new(model: Arc<dyn ModelClient>, config: ModelConfig) -> Self {
        Self {
            model,
            config,
            reference_index: None,
        }
    }

    /// Quote index facts for the profile's ingredients in the prompt
    pub fn with_reference_index(mut self, index: Arc<dyn NutritionIndex>) -> Self {
        self.reference_index = Some(index);
        self
    }

    /// Index records for the ingredients the user already has, exact then fuzzy
    ///
    /// Lookup errors only skip the ingredient.
    async fn reference_records(&self, profile: &Profile) -> Vec<NutritionRecord> {
        let Some(index) = &self.reference_index else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for name in profile.available_ingredients.iter().map(|n| n.trim()) {
            if records.len() >= MAX_REFERENCE_RECORDS {
                break;
            }
            if name.is_empty() {
                continue;
            }
            let found = match index.find_exact(name).await {
                Ok(Some(record)) => Ok(Some(record)),
                Ok(None) => index.find_fuzzy(name).await,
                Err(e) => Err(e),
            };
            match found {
                Ok(Some(record)) => {
                    if seen.insert(record.ingredient_name_keyword.clone()) {
                        records.push(record);
                    }
                }
                Ok(None) => debug!("No reference nutrition for {}", name),
                Err(e) => warn!("Reference nutrition lookup failed for {}: {}", name, e),
            }
        }
        records
    }

    pub async fn generate(&self, profile: &Profile) -> GeneratedRecipe {
        let started = Instant::now();
        let references = self.reference_records(profile).await;
        if !references.is_empty() {
            debug!("Quoting {} index records in the recipe prompt", references.len());
        }
        let request = GenerationRequest {
            model: self.config.recipe_model.clone(),
            prompt: build_grounded_prompt(profile, &references),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let (recipe, source) = match self.model.generate(&request).await {
            Ok(text) => match parse_reply(&text) {
                Some(recipe) => (recipe, RecipeSource::Model),
                None => {
                    warn!(
                        "Model reply for target {} was not a recipe ({} chars), using default",
                        profile.target,
                        text.len()
                    );
                    (
                        default_recipe(profile.target, profile.effective_servings()),
                        RecipeSource::Fallback,
                    )
                }
            },
            Err(e) => {
                warn!("Recipe generation failed for target {}: {}", profile.target, e);
                (
                    default_recipe(profile.target, profile.effective_servings()),
                    RecipeSource::Fallback,
                )
            }
        };

        let elapsed = started.elapsed();
        info!(
            "Generated recipe '{}' for target {} ({:?}, {}ms)",
            recipe.name,
            profile.target,
            source,
            elapsed.as_millis()
        );
        GeneratedRecipe {
            recipe,
            source,
            elapsed,
        }
    }
}

fn parse_reply(text: &str) -> Option<Recipe> {
    let value = extract_json_object(text)?;
    match serde_json::from_value::<Recipe>(value) {
        Ok(recipe) if recipe.is_usable() => Some(recipe),
        Ok(_) => None,
        Err(e) => {
            debug!("Recipe JSON did not match the expected shape: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::MockModelClient;
    use crate::session::Target;

    fn generator(mock: Arc<MockModelClient>) -> RecipeGenerator {
        RecipeGenerator::new(mock, ModelConfig::default())
    }

    #[tokio::test]
    async fn test_parses_model_reply() {
        let mock = Arc::new(MockModelClient::new());
        mock.add_response(
            "여기 있습니다\n{\"recipeName\": \"아보카도 샐러드\", \"servings\": 2, \
             \"ingredients\": [{\"name\": \"아보카도\", \"amount\": \"1\", \"unit\": \"개\"}], \
             \"instructions\": [\"1. 자른다\"]}",
        )
        .await;

        let generated = generator(mock.clone())
            .generate(&Profile::new(Target::Keto))
            .await;
        assert_eq!(generated.source, RecipeSource::Model);
        assert_eq!(generated.recipe.name, "아보카도 샐러드");

        let calls = mock.get_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, ModelConfig::default().recipe_model);
        assert!(calls[0].prompt.contains("케토"));
    }

    #[tokio::test]
    async fn test_prompt_quotes_indexed_ingredients() {
        use crate::nutrition::{MemoryNutritionIndex, NutritionFacts};

        let facts = |calories| NutritionFacts {
            calories,
            protein: 1.0,
            fat: 1.0,
            carbs: 1.0,
            fiber: 0.0,
            sodium: 0.0,
        };
        let index = Arc::new(MemoryNutritionIndex::with_records(vec![
            NutritionRecord::new("계란", "표준식품", facts(143.0)),
            NutritionRecord::new("대파", "표준식품", facts(27.0)),
        ]));
        let mock = Arc::new(MockModelClient::new());
        mock.add_response("{}").await;

        let mut profile = Profile::new(Target::Fridge);
        profile.available_ingredients = vec!["계란".into(), "대파".into(), "계란".into(), "용과".into()];
        generator(mock.clone())
            .with_reference_index(index)
            .generate(&profile)
            .await;

        let prompt = &mock.get_calls().await[0].prompt;
        assert!(prompt.contains("- 계란: 칼로리 143kcal"));
        assert!(prompt.contains("- 대파: 칼로리 27kcal"));
        assert_eq!(prompt.matches("- 계란:").count(), 1);
        assert!(!prompt.contains("- 용과:"));
    }

    #[tokio::test]
    async fn test_no_reference_index_keeps_plain_prompt() {
        let mock = Arc::new(MockModelClient::new());
        mock.add_response("{}").await;
        let mut profile = Profile::new(Target::Fridge);
        profile.available_ingredients = vec!["계란".into()];
        generator(mock.clone()).generate(&profile).await;

        let prompt = &mock.get_calls().await[0].prompt;
        assert_eq!(prompt, &crate::recipe::build_prompt(&profile));
    }

    #[tokio::test]
    async fn test_model_error_yields_default() {
        let mock = Arc::new(MockModelClient::new());
        mock.add_error("throttled").await;
        let generated = generator(mock).generate(&Profile::new(Target::Diet)).await;
        assert_eq!(generated.source, RecipeSource::Fallback);
        assert_eq!(generated.recipe.name, "기본 diet 레시피");
    }

    #[tokio::test]
    async fn test_unparseable_reply_yields_default() {
        let mock = Arc::new(MockModelClient::new());
        mock.add_response("죄송합니다, 레시피를 만들 수 없습니다.").await;
        mock.add_response("{\"unrelated\": true}").await;
        let generator = generator(mock);

        let first = generator.generate(&Profile::default()).await;
        let second = generator.generate(&Profile::default()).await;
        assert_eq!(first.source, RecipeSource::Fallback);
        assert_eq!(second.source, RecipeSource::Fallback);
        assert_eq!(second.recipe.name, "기본 general 레시피");
    }
}
